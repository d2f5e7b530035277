use std::fs::File;
use std::path::Path;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use lofty::config::WriteOptions;
use lofty::file::TaggedFileExt;
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey, Tag, TagExt, TagType};

use crate::config::{AudioFormat, TrackVariant};
use crate::downloader::{AlbumInfo, CoverArt, TrackMetadata};
use crate::errors::{EvRemixesError, Result};

/// Tags read back from a finished file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagSummary {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub album_artist: Option<String>,
    pub date: Option<String>,
    pub genre: Option<String>,
    pub comment: Option<String>,
    pub track_number: Option<u32>,
    pub track_number_text: Option<String>,
    pub disc_number: Option<u32>,
    pub picture_count: usize,
}

/// Writes album and track metadata plus cover art into FLAC and M4A files
pub struct MetadataTagger;

impl MetadataTagger {
    pub fn new() -> Self {
        Self
    }

    /// Tag `path` in place. Never fails: problems are logged and reported as `false`.
    pub fn apply(
        &self,
        track: &TrackMetadata,
        album: &AlbumInfo,
        path: &Path,
        cover: &CoverArt,
        variant: TrackVariant,
        position: usize,
    ) -> bool {
        match self.try_apply(track, album, path, cover, variant, position) {
            Ok(()) => {
                tracing::debug!("Tagged {}", path.display());
                true
            }
            Err(e) => {
                tracing::warn!("Failed to tag {}: {}", path.display(), e);
                false
            }
        }
    }

    fn try_apply(
        &self,
        track: &TrackMetadata,
        album: &AlbumInfo,
        path: &Path,
        cover: &CoverArt,
        variant: TrackVariant,
        position: usize,
    ) -> Result<()> {
        let extension = crate::utils::Utils::get_file_extension(path).unwrap_or_default();
        let format = AudioFormat::from_extension(&extension)
            .ok_or_else(|| EvRemixesError::Metadata(format!("unsupported file type: .{}", extension)))?;

        let tag_type = match format {
            AudioFormat::Flac => TagType::VorbisComments,
            AudioFormat::Alac => TagType::Mp4Ilst,
        };

        let mut tagged_file = Probe::open(path)?.read()?;
        let tag = match tagged_file.tag_mut(tag_type) {
            Some(tag) => tag,
            None => {
                tagged_file.insert_tag(Tag::new(tag_type));
                tagged_file
                    .tag_mut(tag_type)
                    .ok_or_else(|| EvRemixesError::Metadata(format!("{:?} not supported here", tag_type)))?
            }
        };

        let title = track.display_name(variant);
        let number = track.number_or(position);
        let disc = variant.disc_number();

        tag.set_title(title.into_owned());
        tag.set_album(album.album_name.clone());
        tag.set_artist(album.artist_name.clone());
        if !album.genre.is_empty() {
            tag.set_genre(album.genre.clone());
        }
        if !album.year.is_empty() {
            tag.insert_text(ItemKey::RecordingDate, album.year.clone());
        }
        if let Some(album_artist) = album.album_artist.as_deref().filter(|a| !a.is_empty()) {
            tag.insert_text(ItemKey::AlbumArtist, album_artist.to_string());
        }

        match format {
            AudioFormat::Flac => {
                tag.insert_text(ItemKey::TrackNumber, format!("{:02}", number));
                tag.insert_text(ItemKey::DiscNumber, disc.to_string());
                if let Some(comments) = track.comments.as_deref().filter(|c| !c.is_empty()) {
                    tag.insert_text(ItemKey::Description, comments.to_string());
                }
            }
            AudioFormat::Alac => {
                tag.set_track(number);
                tag.set_disk(disc);
                if let Some(comments) = track.comments.as_deref().filter(|c| !c.is_empty()) {
                    tag.insert_text(ItemKey::Comment, comments.to_string());
                }
            }
        }

        match format {
            AudioFormat::Flac => tag.remove_picture_type(PictureType::CoverFront),
            AudioFormat::Alac => {
                // ilst covers carry no picture type
                let types: Vec<PictureType> = tag.pictures().iter().map(|p| p.pic_type()).collect();
                for pic_type in types {
                    tag.remove_picture_type(pic_type);
                }
            }
        }
        tag.push_picture(Picture::new_unchecked(
            PictureType::CoverFront,
            Some(MimeType::Jpeg),
            None,
            cover.jpeg.clone(),
        ));

        tag.save_to_path(path, WriteOptions::default())?;
        Ok(())
    }

    /// Read back the fields this tagger writes
    pub fn read_tags(&self, path: &Path) -> Result<TagSummary> {
        let tagged_file = Probe::open(path)?.read()?;

        let tag = match tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) {
            Some(tag) => tag,
            None => return Ok(TagSummary::default()),
        };

        let text = |key: ItemKey| tag.get_string(&key).map(str::to_string);

        Ok(TagSummary {
            title: tag.title().map(|s| s.to_string()),
            artist: tag.artist().map(|s| s.to_string()),
            album: tag.album().map(|s| s.to_string()),
            album_artist: text(ItemKey::AlbumArtist),
            date: text(ItemKey::RecordingDate),
            genre: tag.genre().map(|s| s.to_string()),
            comment: text(ItemKey::Description).or_else(|| text(ItemKey::Comment)),
            track_number: tag.track(),
            track_number_text: text(ItemKey::TrackNumber),
            disc_number: tag.disk(),
            picture_count: tag.pictures().len(),
        })
    }

    /// Stream duration in whole seconds, rounded
    pub fn probe_duration(&self, path: &Path) -> Result<u32> {
        let file = File::open(path)
            .map_err(|e| EvRemixesError::Metadata(format!("Failed to open file: {}", e)))?;

        let source = MediaSourceStream::new(Box::new(file), Default::default());
        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, source, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| EvRemixesError::Metadata(format!("Failed to probe file: {}", e)))?;

        let track = probed
            .format
            .default_track()
            .ok_or_else(|| EvRemixesError::Metadata("no audio track".to_string()))?;

        let params = &track.codec_params;
        match (params.n_frames, params.sample_rate) {
            (Some(frames), Some(rate)) if rate > 0 => {
                Ok(((frames as f64) / (rate as f64)).round() as u32)
            }
            _ => Err(EvRemixesError::Metadata("duration unknown".to_string())),
        }
    }
}

impl Default for MetadataTagger {
    fn default() -> Self {
        Self::new()
    }
}
