use crate::downloader::CoverArt;
use crate::errors::CoverArtError;
use crate::utils::net::NetworkUtils;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;

type CoverResult<T> = std::result::Result<T, CoverArtError>;

/// Embedded covers are always this many pixels square
pub const COVER_SIZE: u32 = 800;

/// Cover art downloader and processor
pub struct CoverArtProcessor<'a> {
    net: &'a NetworkUtils,
    quality: u8,
}

impl<'a> CoverArtProcessor<'a> {
    /// JPEG output at `quality`
    pub fn new(net: &'a NetworkUtils, quality: u8) -> Self {
        Self { net, quality }
    }

    /// Download, normalize, and encode the album cover
    pub async fn process(&self, cover_url: Option<&str>) -> CoverResult<CoverArt> {
        let url = cover_url
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or(CoverArtError::MissingUrl)?;

        tracing::info!("Downloading cover art from {}", url);
        let image_data = self.download_image(url).await?;
        tracing::debug!("Cover art downloaded: {} bytes", image_data.len());

        self.normalize(&image_data)
    }

    async fn download_image(&self, url: &str) -> CoverResult<Vec<u8>> {
        self.net
            .get_bytes(url)
            .await
            .map_err(|e| CoverArtError::Download(e.to_string()))
    }

    /// Decode any supported format, force RGB, resize exactly (aspect ratio is
    /// not preserved), and encode as JPEG
    pub fn normalize(&self, image_data: &[u8]) -> CoverResult<CoverArt> {
        let img = image::load_from_memory(image_data).map_err(CoverArtError::Decode)?;

        let resized = img.resize_exact(COVER_SIZE, COVER_SIZE, image::imageops::FilterType::Lanczos3);
        let jpeg = self.image_to_bytes(&resized)?;

        Ok(CoverArt {
            jpeg,
            width: COVER_SIZE,
            height: COVER_SIZE,
        })
    }

    fn image_to_bytes(&self, image: &DynamicImage) -> CoverResult<Vec<u8>> {
        let rgb = image.to_rgb8();
        let mut bytes = Vec::new();

        JpegEncoder::new_with_quality(&mut bytes, self.quality)
            .encode_image(&rgb)
            .map_err(CoverArtError::Encode)?;

        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbaImage};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, image::Rgba([200, 30, 30, 128])));
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
        bytes
    }

    #[test]
    fn test_normalize_produces_square_rgb_jpeg() {
        let net = NetworkUtils::new();
        let processor = CoverArtProcessor::new(&net, 95);

        let cover = processor.normalize(&png_bytes(1200, 600)).unwrap();

        assert_eq!((cover.width, cover.height), (800, 800));
        let decoded = image::load_from_memory(&cover.jpeg).unwrap();
        assert_eq!(image::guess_format(&cover.jpeg).unwrap(), ImageFormat::Jpeg);
        assert_eq!((decoded.width(), decoded.height()), (800, 800));
        assert_eq!(decoded.color(), image::ColorType::Rgb8);
    }

    #[test]
    fn test_undecodable_bytes() {
        let net = NetworkUtils::new();
        let processor = CoverArtProcessor::new(&net, 95);
        assert!(matches!(processor.normalize(b"not an image"), Err(CoverArtError::Decode(_))));
    }

    #[tokio::test]
    async fn test_missing_url_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let net = NetworkUtils::new();
        let processor = CoverArtProcessor::new(&net, 95);

        assert!(matches!(processor.process(None).await, Err(CoverArtError::MissingUrl)));
        assert!(matches!(processor.process(Some("  ")).await, Err(CoverArtError::MissingUrl)));
    }

    #[tokio::test]
    async fn test_process_downloads_and_resizes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cover.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes(64, 32)))
            .mount(&server)
            .await;

        let net = NetworkUtils::new();
        let processor = CoverArtProcessor::new(&net, 95);
        let url = format!("{}/cover.png", server.uri());

        let cover = processor.process(Some(&url)).await.unwrap();
        assert_eq!(cover.width, 800);
        assert!(!cover.jpeg.is_empty());
    }

    #[tokio::test]
    async fn test_download_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let net = NetworkUtils::new();
        let processor = CoverArtProcessor::new(&net, 95);
        let url = format!("{}/cover.png", server.uri());

        assert!(matches!(processor.process(Some(&url)).await, Err(CoverArtError::Download(_))));
    }
}
