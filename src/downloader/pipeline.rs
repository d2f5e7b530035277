use crate::config::{AudioFormat, TrackVariant};
use crate::downloader::{
    AlbumInfo, CoverArt, Destination, DownloadSelection, FormatConverter, Manifest, MetadataTagger, OutputPlacer,
    RunSummary, TrackFetcher, TrackMetadata, TrackOutcome, TrackStage,
};
use crate::errors::{EvRemixesError, Result};
use crate::publish::{PublishRequest, Publisher};
use crate::utils::logger::Logger;
use crate::utils::net::NetworkUtils;
use crate::utils::Utils;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Cover art for both renditions; instrumentals fall back to the album cover
#[derive(Debug, Clone)]
pub struct AlbumArt {
    pub original: CoverArt,
    pub instrumental: Option<CoverArt>,
}

impl AlbumArt {
    pub fn for_variant(&self, variant: TrackVariant) -> &CoverArt {
        match variant {
            TrackVariant::Instrumental => self.instrumental.as_ref().unwrap_or(&self.original),
            TrackVariant::Original => &self.original,
        }
    }
}

/// Where a job's audio comes from
#[derive(Debug, Clone, PartialEq)]
pub enum TrackSource {
    /// Hosted file for the track's variant, requested in this format
    Remote(AudioFormat),
    /// A local master; never modified
    Local(PathBuf),
}

/// One track through fetch, convert, tag, place, publish
#[derive(Debug, Clone)]
pub struct TrackJob<'m> {
    pub track: &'m TrackMetadata,
    /// 1-based position after sorting
    pub position: usize,
    pub variant: TrackVariant,
    pub source: TrackSource,
    /// Format of the finished file
    pub output_format: AudioFormat,
    /// Final file path; `None` keeps the file in the run's work dir
    pub destination: Option<PathBuf>,
    pub publish: Option<PublishRequest>,
}

/// Runs tracks one after another, isolating failures per track
pub struct Pipeline<'a> {
    fetcher: TrackFetcher<'a>,
    converter: FormatConverter,
    tagger: MetadataTagger,
    work_dir: PathBuf,
    publisher: Option<&'a dyn Publisher>,
    show_progress: bool,
}

impl<'a> Pipeline<'a> {
    /// `work_dir` should be run-scoped; intermediates are written below it
    pub fn new(net: &'a NetworkUtils, work_dir: &Path) -> Self {
        Self {
            fetcher: TrackFetcher::new(net),
            converter: FormatConverter::new(),
            tagger: MetadataTagger::new(),
            work_dir: work_dir.to_path_buf(),
            publisher: None,
            show_progress: true,
        }
    }

    pub fn with_converter(mut self, converter: FormatConverter) -> Self {
        self.converter = converter;
        self
    }

    pub fn with_publisher(mut self, publisher: &'a dyn Publisher) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn quiet(mut self) -> Self {
        self.show_progress = false;
        self
    }

    pub fn tagger(&self) -> &MetadataTagger {
        &self.tagger
    }

    fn spinner(&self, message: String) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    /// Download every selected format and variant of every manifest track.
    /// Destination folders are cleared once per run, before their first track.
    pub async fn run_downloads(&self, manifest: &Manifest, art: &AlbumArt, selection: &DownloadSelection) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        let mut prepared: HashSet<PathBuf> = HashSet::new();

        for &format in &selection.formats {
            for &variant in &selection.variants {
                let folder = selection
                    .destination
                    .folder_for(&manifest.metadata.album_name, format, variant);

                if prepared.insert(folder.clone()) {
                    OutputPlacer::prepare(&folder)?;
                }

                if self.show_progress {
                    println!("\nDownloading {} {} to {}...", variant, format.long_name(), folder.display());
                }

                let jobs: Vec<TrackJob> = manifest
                    .tracks
                    .iter()
                    .enumerate()
                    .map(|(index, track)| {
                        let position = index + 1;
                        let name = track.display_name(variant);
                        let number = track.number_or(position);
                        let destination = match &selection.destination {
                            Destination::Local(base) => OutputPlacer::place(
                                &manifest.metadata.album_name,
                                number,
                                &name,
                                format.extension(),
                                base,
                            ),
                            Destination::AdminLibrary(_) => {
                                folder.join(OutputPlacer::file_name(number, &name, format.extension()))
                            }
                        };
                        TrackJob {
                            track,
                            position,
                            variant,
                            source: TrackSource::Remote(format),
                            output_format: format,
                            destination: Some(destination),
                            publish: None,
                        }
                    })
                    .collect();

                summary.merge(self.run(&jobs, &manifest.metadata, art).await);
            }
        }

        Ok(summary)
    }

    /// Process jobs in order. A failing track never stops the ones after it.
    pub async fn run(&self, jobs: &[TrackJob<'_>], album: &AlbumInfo, art: &AlbumArt) -> RunSummary {
        let mut summary = RunSummary::default();
        let total = jobs.len();

        for (index, job) in jobs.iter().enumerate() {
            let name = job.track.display_name(job.variant).into_owned();
            let pb = self.spinner(format!("{} ({}/{})", name, index + 1, total));

            let outcome = self.process_track(job, album, art.for_variant(job.variant), &pb).await;
            match &outcome.error {
                None => {
                    pb.finish_with_message(format!("✔ {}", name));
                    if let Some(path) = &outcome.output_path {
                        Logger::log_track_complete(&name, &path.display().to_string());
                    }
                }
                Some(error) => {
                    pb.abandon_with_message(format!("✘ {}: {}", name, error));
                    Logger::log_track_failed(&name, error);
                }
            }

            summary.record(&outcome);
        }

        summary
    }

    /// Drive one track to a terminal state
    pub async fn process_track(&self, job: &TrackJob<'_>, album: &AlbumInfo, cover: &CoverArt, pb: &ProgressBar) -> TrackOutcome {
        let name = job.track.display_name(job.variant).into_owned();
        let mut outcome = TrackOutcome {
            name: name.clone(),
            stage: TrackStage::Pending,
            output_path: None,
            remote: None,
            error: None,
        };

        if let Err(e) = self.drive(job, album, cover, pb, &mut outcome).await {
            tracing::debug!("{} failed after stage {}", name, outcome.stage);
            outcome.stage = TrackStage::Failed;
            outcome.error = Some(e.to_string());
        }

        outcome
    }

    async fn drive(
        &self,
        job: &TrackJob<'_>,
        album: &AlbumInfo,
        cover: &CoverArt,
        pb: &ProgressBar,
        outcome: &mut TrackOutcome,
    ) -> Result<()> {
        // Scratch space for this track only; removed when it goes out of scope
        let scratch = tempfile::Builder::new().prefix("track-").tempdir_in(&self.work_dir)?;
        let name = outcome.name.clone();

        Logger::log_track_stage(&name, "fetch");
        let fetched = match &job.source {
            TrackSource::Remote(format) => {
                pb.set_message(format!("Downloading {}...", name));
                self.fetcher
                    .fetch_to(job.track, job.variant, *format, scratch.path())
                    .await?
            }
            TrackSource::Local(path) if path.is_file() => {
                // tag a working copy, never the master
                let file_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_else(|| "master".into());
                let copy = scratch.path().join(file_name);
                tokio::fs::copy(path, &copy).await?;
                copy
            }
            TrackSource::Local(path) => {
                return Err(EvRemixesError::FileNotFound(path.display().to_string()));
            }
        };
        outcome.stage = TrackStage::Fetched;

        pb.set_message(format!("Converting {}...", name));
        Logger::log_track_stage(&name, "convert");
        let converted = self.converter.convert(&fetched, job.output_format, scratch.path()).await?;
        outcome.stage = TrackStage::Converted;

        pb.set_message(format!("Applying metadata to {}...", name));
        Logger::log_track_stage(&name, "tag");
        if !self.tagger.apply(job.track, album, &converted, cover, job.variant, job.position) {
            return Err(EvRemixesError::Metadata(format!("failed to add metadata to {}", name)));
        }
        outcome.stage = TrackStage::Tagged;

        let final_path = match &job.destination {
            Some(destination) => {
                Logger::log_track_stage(&name, "place");
                OutputPlacer::write(&converted, destination)?;
                destination.clone()
            }
            None => converted,
        };
        // scratch files vanish with the track, so only placed files are reported
        outcome.output_path = job.destination.clone();
        outcome.stage = TrackStage::Placed;

        if let (Some(publisher), Some(request)) = (self.publisher, &job.publish) {
            pb.set_message(format!("Uploading {} to {}...", name, publisher.name()));
            Logger::log_track_stage(&name, "publish");

            let mut request = request.clone();
            if request.duration_secs.is_none() {
                request.duration_secs = match self.tagger.probe_duration(&final_path) {
                    Ok(secs) => {
                        tracing::debug!("{} runs {}", name, Utils::format_duration(secs));
                        Some(secs)
                    }
                    Err(e) => {
                        tracing::debug!("No duration for {}: {}", name, e);
                        None
                    }
                };
            }

            let remote = publisher.publish(&final_path, &request).await?;
            tracing::info!("Published {} to {}", name, remote.location);
            outcome.remote = Some(remote);
            outcome.stage = TrackStage::Published;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::metadata::tests::{cover_fixture, flac_fixture};
    use crate::publish::{PublishFuture, RemoteReference};
    use std::cell::RefCell;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Records publish calls instead of uploading
    #[derive(Default)]
    struct RecordingPublisher {
        published: RefCell<Vec<String>>,
    }

    impl Publisher for RecordingPublisher {
        fn name(&self) -> &'static str {
            "recorder"
        }

        fn publish<'a>(&'a self, _local_path: &'a Path, request: &'a PublishRequest) -> PublishFuture<'a> {
            Box::pin(async move {
                self.published.borrow_mut().push(request.track_name.clone());
                Ok(RemoteReference {
                    location: format!("memory://{}", request.blob_name),
                    purge_path: None,
                })
            })
        }
    }

    fn album() -> AlbumInfo {
        AlbumInfo {
            album_name: "Evanescence Remixes".into(),
            album_artist: Some("Danny Stewart".into()),
            artist_name: "Evanescence".into(),
            genre: "Electronic".into(),
            year: "2024".into(),
            cover_art_url: "unused".into(),
            inst_cover_art_url: None,
        }
    }

    fn manifest(base: &str) -> Manifest {
        let track = |n: u32, name: &str| TrackMetadata {
            track_name: name.to_string(),
            file_url: format!("{}/ev/{}.flac", base, name),
            inst_url: Some(format!("{}/ev/{}-Inst.flac", base, name)),
            track_number: Some(n),
            ..Default::default()
        };
        Manifest {
            metadata: album(),
            tracks: vec![track(1, "Lithium"), track(2, "Whisper"), track(3, "Haunted")],
        }
    }

    async fn serve(server: &MockServer, route: &str, status: u16) {
        let response = if status == 200 {
            ResponseTemplate::new(200).set_body_bytes(flac_fixture())
        } else {
            ResponseTemplate::new(status)
        };
        Mock::given(method("GET")).and(path(route)).respond_with(response).mount(server).await;
    }

    fn art() -> AlbumArt {
        AlbumArt { original: cover_fixture(), instrumental: None }
    }

    #[tokio::test]
    async fn test_failing_track_does_not_stop_the_run() {
        let server = MockServer::start().await;
        serve(&server, "/ev/Lithium.flac", 200).await;
        serve(&server, "/ev/Whisper.flac", 404).await;
        serve(&server, "/ev/Haunted.flac", 200).await;

        let manifest = manifest(&server.uri());
        let net = NetworkUtils::new();
        let work = tempfile::tempdir().unwrap();
        let recorder = RecordingPublisher::default();
        let pipeline = Pipeline::new(&net, work.path()).with_publisher(&recorder).quiet();

        let jobs: Vec<TrackJob> = manifest
            .tracks
            .iter()
            .enumerate()
            .map(|(i, track)| TrackJob {
                track,
                position: i + 1,
                variant: TrackVariant::Original,
                source: TrackSource::Remote(AudioFormat::Flac),
                output_format: AudioFormat::Flac,
                destination: None,
                publish: Some(PublishRequest {
                    track_name: track.track_name.clone(),
                    title: track.track_name.clone(),
                    performer: "Evanescence".into(),
                    format: AudioFormat::Flac,
                    blob_name: track.track_name.clone(),
                    duration_secs: Some(1),
                    caption: None,
                }),
            })
            .collect();

        let summary = pipeline.run(&jobs, &manifest.metadata, &art()).await;

        assert_eq!(summary.total, 3);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, "Whisper");
        assert_eq!(*recorder.published.borrow(), vec!["Lithium".to_string(), "Haunted".to_string()]);
    }

    #[tokio::test]
    async fn test_run_downloads_places_tagged_files() {
        let server = MockServer::start().await;
        for name in ["Lithium", "Whisper", "Haunted"] {
            serve(&server, &format!("/ev/{}.flac", name), 200).await;
            serve(&server, &format!("/ev/{}-Inst.flac", name), 200).await;
        }

        let manifest = manifest(&server.uri());
        let net = NetworkUtils::new();
        let work = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(&net, work.path()).quiet();

        let selection = DownloadSelection {
            formats: vec![AudioFormat::Flac],
            variants: vec![TrackVariant::Original, TrackVariant::Instrumental],
            destination: Destination::Local(out.path().to_path_buf()),
        };

        // twice, to show re-runs leave exactly one file per track
        for _ in 0..2 {
            let summary = pipeline.run_downloads(&manifest, &art(), &selection).await.unwrap();
            assert_eq!(summary.succeeded, 6);
            assert!(summary.all_succeeded());
        }

        let album_dir = out.path().join("Evanescence Remixes");
        let files = crate::utils::fs::FileUtils::list_files(&album_dir).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 6);
        assert!(names.contains(&"02 - Whisper.flac".to_string()));
        assert!(names.contains(&"02 - Whisper (Instrumental).flac".to_string()));

        let tags = pipeline.tagger().read_tags(&album_dir.join("03 - Haunted (Instrumental).flac")).unwrap();
        assert_eq!(tags.title.as_deref(), Some("Haunted (Instrumental)"));
        assert_eq!(tags.disc_number, Some(2));
        assert_eq!(tags.track_number_text.as_deref(), Some("03"));
    }

    #[tokio::test]
    async fn test_missing_instrumental_url_fails_only_that_track() {
        let server = MockServer::start().await;
        serve(&server, "/ev/Lithium-Inst.flac", 200).await;

        let mut manifest = manifest(&server.uri());
        manifest.tracks.truncate(2);
        manifest.tracks[1].inst_url = None;

        let net = NetworkUtils::new();
        let work = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(&net, work.path()).quiet();
        let selection = DownloadSelection {
            formats: vec![AudioFormat::Flac],
            variants: vec![TrackVariant::Instrumental],
            destination: Destination::AdminLibrary(out.path().to_path_buf()),
        };

        let summary = pipeline.run_downloads(&manifest, &art(), &selection).await.unwrap();
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed[0].0, "Whisper (Instrumental)");
        assert!(out.path().join("Instrumentals FLAC/01 - Lithium (Instrumental).flac").exists());
    }

    #[tokio::test]
    async fn test_local_master_is_left_untouched() {
        let net = NetworkUtils::new();
        let work = tempfile::tempdir().unwrap();
        let masters = tempfile::tempdir().unwrap();
        let master = masters.path().join("Lithium 1.0.2.flac");
        std::fs::write(&master, flac_fixture()).unwrap();

        let manifest = manifest("https://unused.example.com");
        let destination = work.path().join("out").join("Lithium.flac");
        let job = TrackJob {
            track: &manifest.tracks[0],
            position: 1,
            variant: TrackVariant::Original,
            source: TrackSource::Local(master.clone()),
            output_format: AudioFormat::Flac,
            destination: Some(destination.clone()),
            publish: None,
        };

        let pipeline = Pipeline::new(&net, work.path()).quiet();
        let summary = pipeline.run(std::slice::from_ref(&job), &manifest.metadata, &art()).await;

        assert!(summary.all_succeeded());
        assert_eq!(std::fs::read(&master).unwrap(), flac_fixture());
        let tags = pipeline.tagger().read_tags(&destination).unwrap();
        assert_eq!(tags.title.as_deref(), Some("Lithium"));
        assert_eq!(tags.picture_count, 1);
    }
}
