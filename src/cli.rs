use clap::{ArgAction, Args, Parser, Subcommand};
use crate::config::{AudioFormat, Config, FormatChoice, Location, TrackVariant, VariantChoice};
use crate::downloader::manifest::sorted_by_start_date;
use crate::downloader::{
    AlbumArt, AlbumInfo, CoverArtProcessor, Destination, DownloadSelection, FormatConverter, Manifest,
    ManifestClient, Pipeline, RunSummary, TrackJob, TrackMetadata, TrackSource,
};
use crate::errors::{EvRemixesError, Result};
use crate::prompt::StdPrompter;
use crate::publish::{BlobPublisher, CdnPurger, PublishRequest, TelegramClient, TelegramPublisher, UploadCache};
use crate::settings::{Settings, GET_INSTRUMENTALS_VAR};
use crate::utils::fs::FileUtils;
use crate::utils::net::NetworkUtils;
use crate::utils::Utils;
use std::path::{Path, PathBuf};

/// Masters accepted by `upload`
const MASTER_EXTENSIONS: [&str; 3] = ["wav", "aif", "aiff"];

/// evremixes - Download, tag and publish Evanescence remixes
#[derive(Parser, Debug)]
#[command(name = "evremixes")]
#[command(about = "Downloads Evanescence remixes with full metadata, and publishes new ones")]
#[command(version)]
pub struct Cli {
    /// More log output (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of the default one
    #[arg(long, global = true, value_name = "FILE", env = "EVREMIXES_CONFIG")]
    pub config: Option<PathBuf>,

    /// Defaults to `download`
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Download the remixes
    Download(DownloadArgs),

    /// Convert a local master, tag it and upload it to blob storage
    Upload {
        /// WAV or AIFF master
        input: PathBuf,

        /// Remote file name; ending it in .flac or .m4a uploads only that format
        name: Option<String>,

        /// Upload only FLAC
        #[arg(long, conflicts_with = "alac_only")]
        flac_only: bool,

        /// Upload only ALAC
        #[arg(long)]
        alac_only: bool,

        /// Don't purge the CDN afterwards
        #[arg(long)]
        skip_purge: bool,
    },

    /// Rebuild hosted tracks from their FLAC masters and upload them again
    Reupload {
        #[command(flatten)]
        selection: TrackArgs,

        /// Formats to upload
        #[arg(short, long, value_enum, default_value = "both")]
        format: FormatChoice,

        /// Don't purge the CDN afterwards
        #[arg(long)]
        skip_purge: bool,
    },

    /// Post tracks to the Telegram channel, replacing earlier posts
    Telegram {
        #[command(flatten)]
        selection: TrackArgs,

        /// Ask for a caption for each track
        #[arg(long)]
        comment: bool,
    },

    /// Purge the CDN cache for all tracks
    Purge,

    /// Configure application settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct DownloadArgs {
    /// Output format
    #[arg(short, long, value_enum)]
    pub format: Option<FormatChoice>,

    /// Regular tracks, instrumentals, or both
    #[arg(long, value_enum)]
    pub variant: Option<VariantChoice>,

    /// Download location
    #[arg(short, long, value_enum)]
    pub location: Option<Location>,

    /// Custom download folder (implies `--location custom`)
    #[arg(long, value_name = "DIR")]
    pub path: Option<PathBuf>,

    /// Every format and variant into the OneDrive library
    #[arg(long)]
    pub admin: bool,

    /// Instrumentals only
    #[arg(long, conflicts_with = "variant")]
    pub instrumentals: bool,

    /// Don't open the output folder afterwards
    #[arg(long)]
    pub no_open: bool,
}

/// Which manifest tracks to publish; a menu is shown when neither is given
#[derive(Args, Debug, Clone, Default)]
pub struct TrackArgs {
    /// Track name, as listed in the manifest (repeatable)
    #[arg(short, long = "track", value_name = "NAME")]
    pub tracks: Vec<String>,

    /// Every track
    #[arg(long, conflicts_with = "tracks")]
    pub all: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Print the config file location
    Path,

    /// Reset to default settings
    Reset,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse() -> Self {
        <Cli as clap::Parser>::parse()
    }

    /// Execute the CLI command
    pub async fn execute(self, settings: Settings) -> Result<()> {
        let command = self
            .command
            .unwrap_or_else(|| Commands::Download(DownloadArgs::default()));

        match command {
            Commands::Config { command } => handle_config(settings, command),
            Commands::Purge => {
                let purger = CdnPurger::new(settings.config().cdn_config.clone());
                purger.purge(&[]).await?;
                println!("CDN cache purged.");
                Ok(())
            }
            Commands::Download(args) => {
                let session = Session::new(&settings)?;
                session.download(&args).await
            }
            Commands::Upload { input, name, flac_only, alac_only, skip_purge } => {
                let session = Session::new(&settings)?;
                session
                    .upload(&input, name.as_deref(), flac_only, alac_only, skip_purge)
                    .await
            }
            Commands::Reupload { selection, format, skip_purge } => {
                let session = Session::new(&settings)?;
                session.reupload(&selection, format, skip_purge).await
            }
            Commands::Telegram { selection, comment } => {
                let session = Session::new(&settings)?;
                session.telegram(&selection, comment).await
            }
        }
    }
}

fn handle_config(mut settings: Settings, command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            let config = settings.config();
            let credentials = settings.credentials();

            println!("Current configuration ({}):\n", settings.config_path()?.display());
            println!("{}", toml::to_string_pretty(config)?);
            println!("Blob storage credentials: {}", set_or_not(credentials.sas_url.is_some()));
            println!(
                "Telegram credentials: {}",
                set_or_not(credentials.telegram_bot_token.is_some() && credentials.telegram_channel_id.is_some())
            );
        }
        ConfigCommands::Path => {
            println!("{}", settings.config_path()?.display());
        }
        ConfigCommands::Reset => {
            settings.reset()?;
            println!("Configuration reset to defaults");
        }
    }

    Ok(())
}

fn set_or_not(set: bool) -> &'static str {
    if set {
        "Set"
    } else {
        "Not set"
    }
}

/// State for one command run: one HTTP client and a work directory that is
/// removed, with any partial files, when the session drops
struct Session<'s> {
    settings: &'s Settings,
    net: NetworkUtils,
    work_dir: tempfile::TempDir,
}

impl<'s> Session<'s> {
    fn new(settings: &'s Settings) -> Result<Self> {
        let work_dir = tempfile::Builder::new().prefix("evremixes-").tempdir()?;
        tracing::debug!("Work directory: {}", work_dir.path().display());

        Ok(Self {
            settings,
            net: NetworkUtils::with_timeout(settings.config().request_timeout()),
            work_dir,
        })
    }

    fn config(&self) -> &Config {
        self.settings.config()
    }

    fn pipeline(&self) -> Pipeline<'_> {
        Pipeline::new(&self.net, self.work_dir.path())
    }

    /// Fail before anything is uploaded when ffmpeg cannot run
    async fn require_ffmpeg(&self) -> Result<()> {
        let version = FormatConverter::new().version().await?;
        tracing::debug!("Using {}", version);
        Ok(())
    }

    async fn manifest(&self) -> Result<Manifest> {
        ManifestClient::new(&self.net, self.config().manifest_url.as_str()).fetch().await
    }

    /// Album cover, plus the instrumental cover when those tracks are wanted
    async fn album_art(&self, album: &AlbumInfo, with_instrumental: bool) -> Result<AlbumArt> {
        let cover = &self.config().cover_config;
        let processor = CoverArtProcessor::new(&self.net, cover.jpeg_quality);

        let original = processor.process(Some(album.cover_art_url.as_str())).await?;
        let instrumental = match album.inst_cover_art_url.as_deref().filter(|u| !u.trim().is_empty()) {
            Some(url) if with_instrumental => Some(processor.process(Some(url)).await?),
            _ => None,
        };

        Ok(AlbumArt { original, instrumental })
    }

    async fn download(&self, args: &DownloadArgs) -> Result<()> {
        let selection = self.resolve_selection(args).await?;
        let manifest = self.manifest().await?;
        let art = self
            .album_art(&manifest.metadata, selection.variants.contains(&TrackVariant::Instrumental))
            .await?;

        let summary = self.pipeline().run_downloads(&manifest, &art, &selection).await?;
        println!("\n{}", summary);

        if summary.succeeded > 0 {
            let root = match &selection.destination {
                Destination::Local(base) => base.join(Utils::sanitize_album_name(&manifest.metadata.album_name)),
                Destination::AdminLibrary(root) => root.clone(),
            };
            println!("Saved to {}", root.display());

            if self.config().open_folder && !args.no_open {
                if let Err(e) = FileUtils::open_in_file_manager(&root).await {
                    tracing::warn!("Could not open {}: {}", root.display(), e);
                }
            }
        }

        Ok(())
    }

    /// Flags and environment first, prompts for whatever is left
    async fn resolve_selection(&self, args: &DownloadArgs) -> Result<DownloadSelection> {
        let config = self.config();

        if args.admin || self.settings.admin_download() {
            println!(
                "Admin download: regular and instrumentals in all formats to {}",
                config.onedrive_directory.display()
            );
            return Ok(admin_selection(config));
        }

        let mut prompter = StdPrompter::stdio();

        let variants = if args.instrumentals || self.settings.get_instrumentals() {
            if self.settings.get_instrumentals() {
                println!("{} is set, so only instrumentals will be downloaded.", GET_INSTRUMENTALS_VAR);
            }
            vec![TrackVariant::Instrumental]
        } else if let Some(choice) = args.variant {
            choice.variants()
        } else {
            let menu = [
                (VariantChoice::Original, "Regular tracks"),
                (VariantChoice::Instrumental, "Instrumentals"),
                (VariantChoice::Both, "Both"),
            ];
            let labels: Vec<&str> = menu.iter().map(|(_, label)| *label).collect();
            menu[prompter.select("Choose track type", &labels).await?].0.variants()
        };

        let formats = match args.format {
            Some(choice) => choice.formats(),
            None => {
                let menu = format_menu();
                let labels: Vec<&str> = menu.iter().map(|(_, label)| *label).collect();
                menu[prompter.select("Choose format", &labels).await?].0.formats()
            }
        };

        let location = match (args.location, &args.path) {
            (_, Some(_)) => Location::Custom,
            (Some(location), None) => location,
            (None, None) => {
                let menu = [Location::Downloads, Location::Music, Location::Custom];
                let labels: Vec<String> = menu.iter().map(|l| l.to_string()).collect();
                menu[prompter.select("Choose download location", &labels).await?]
            }
        };

        let base = match location {
            Location::Downloads => config.downloads_directory.clone(),
            Location::Music => config.music_directory.clone(),
            Location::Onedrive => config.onedrive_directory.clone(),
            Location::Custom => match &args.path {
                Some(path) => path.clone(),
                None => {
                    let typed = prompter.text("Enter custom path").await?;
                    if typed.is_empty() {
                        return Err(EvRemixesError::Cancelled);
                    }
                    Utils::expand_home(&typed)
                }
            },
        };

        Ok(DownloadSelection {
            formats,
            variants,
            destination: Destination::Local(base),
        })
    }

    async fn upload(
        &self,
        input: &Path,
        name: Option<&str>,
        flac_only: bool,
        alac_only: bool,
        skip_purge: bool,
    ) -> Result<()> {
        if !input.is_file() {
            return Err(EvRemixesError::FileNotFound(input.display().to_string()));
        }
        let extension = Utils::get_file_extension(input).unwrap_or_default();
        if !MASTER_EXTENSIONS.contains(&extension.as_str()) {
            return Err(EvRemixesError::InvalidFormat(format!(
                "{} is not a WAV or AIFF master",
                input.display()
            )));
        }

        let sas_url = self.settings.credentials().require_sas_url()?;
        let publisher = BlobPublisher::new(self.net.client().clone(), sas_url, &self.config().blob_config)?;
        self.require_ffmpeg().await?;

        let (blob_name, formats) = upload_target(input, name, flac_only, alac_only);
        let manifest = self.manifest().await?;

        let track = match manifest
            .match_upload_name(&blob_name)
            .or_else(|| manifest.find_track(&blob_name))
        {
            Some(track) => track,
            None => {
                let menu = sorted_by_start_date(&manifest.tracks, true);
                let labels: Vec<&str> = menu.iter().map(|t| t.track_name.as_str()).collect();
                let question = format!("No track matches \"{}\". Tag it as", blob_name);
                menu[StdPrompter::stdio().select(&question, &labels).await?]
            }
        };
        println!("Uploading {} as {}", input.display(), track.track_name);

        let art = self.album_art(&manifest.metadata, false).await?;
        let jobs: Vec<TrackJob> = formats
            .iter()
            .map(|&format| TrackJob {
                track,
                position: position_of(&manifest, track),
                variant: TrackVariant::Original,
                source: TrackSource::Local(input.to_path_buf()),
                output_format: format,
                destination: None,
                publish: Some(publish_request(track, &manifest.metadata, format, blob_name.clone(), None)),
            })
            .collect();

        let summary = self
            .pipeline()
            .with_publisher(&publisher)
            .run(&jobs, &manifest.metadata, &art)
            .await;

        self.report_published(&summary, skip_purge).await;
        Ok(())
    }

    async fn reupload(&self, selection: &TrackArgs, format: FormatChoice, skip_purge: bool) -> Result<()> {
        let sas_url = self.settings.credentials().require_sas_url()?;
        let publisher = BlobPublisher::new(self.net.client().clone(), sas_url, &self.config().blob_config)?;
        if format.formats().contains(&AudioFormat::Alac) {
            self.require_ffmpeg().await?;
        }

        let manifest = self.manifest().await?;
        let chosen = self.choose_tracks(&manifest, selection).await?;
        if chosen.is_empty() {
            println!("No tracks selected.");
            return Ok(());
        }

        let art = self.album_art(&manifest.metadata, false).await?;
        let formats = format.formats();
        let mut jobs = Vec::with_capacity(chosen.len() * formats.len());
        for &track in &chosen {
            for &format in &formats {
                jobs.push(TrackJob {
                    track,
                    position: position_of(&manifest, track),
                    variant: TrackVariant::Original,
                    source: TrackSource::Remote(AudioFormat::Flac),
                    output_format: format,
                    destination: None,
                    publish: Some(publish_request(track, &manifest.metadata, format, blob_name_for(track), None)),
                });
            }
        }

        let summary = self
            .pipeline()
            .with_publisher(&publisher)
            .run(&jobs, &manifest.metadata, &art)
            .await;

        self.report_published(&summary, skip_purge).await;
        Ok(())
    }

    async fn telegram(&self, selection: &TrackArgs, comment: bool) -> Result<()> {
        let (token, channel) = self.settings.credentials().require_telegram()?;
        let telegram = &self.config().telegram_config;
        self.require_ffmpeg().await?;

        let cache = UploadCache::load(&self.config().upload_cache_path()?, telegram.cache_retention_days);
        tracing::debug!("Upload cache has {} tracks", cache.len());
        let client = TelegramClient::new(self.net.client().clone(), &telegram.api_base_url, token, channel);
        let publisher = TelegramPublisher::new(client, cache);

        let manifest = self.manifest().await?;
        let chosen = self.choose_tracks(&manifest, selection).await?;
        if chosen.is_empty() {
            println!("No tracks selected.");
            return Ok(());
        }

        // every caption is asked for before the first upload starts
        let mut captions: Vec<Option<String>> = vec![None; chosen.len()];
        if comment {
            let mut prompter = StdPrompter::stdio();
            for (caption, track) in captions.iter_mut().zip(&chosen) {
                let text = prompter
                    .text(&format!("Caption for {} (blank for none)", track.track_name))
                    .await?;
                *caption = Some(text).filter(|t| !t.is_empty());
            }
        }

        let art = self.album_art(&manifest.metadata, false).await?;
        let jobs: Vec<TrackJob> = chosen
            .iter()
            .zip(captions)
            .map(|(&track, caption)| TrackJob {
                track,
                position: position_of(&manifest, track),
                variant: TrackVariant::Original,
                source: TrackSource::Remote(AudioFormat::Flac),
                output_format: AudioFormat::Alac,
                destination: None,
                publish: Some(publish_request(
                    track,
                    &manifest.metadata,
                    AudioFormat::Alac,
                    blob_name_for(track),
                    caption,
                )),
            })
            .collect();

        let summary = self
            .pipeline()
            .with_publisher(&publisher)
            .run(&jobs, &manifest.metadata, &art)
            .await;

        println!("\n{}", summary);
        Ok(())
    }

    /// Tracks named on the command line, all of them, or a menu pick (newest
    /// first), returned oldest first for uploading
    async fn choose_tracks<'m>(&self, manifest: &'m Manifest, args: &TrackArgs) -> Result<Vec<&'m TrackMetadata>> {
        let chosen: Vec<&TrackMetadata> = if args.all {
            manifest.tracks.iter().collect()
        } else if !args.tracks.is_empty() {
            args.tracks
                .iter()
                .map(|name| {
                    manifest
                        .find_track(name)
                        .ok_or_else(|| EvRemixesError::Manifest(format!("no track named \"{}\"", name)))
                })
                .collect::<Result<_>>()?
        } else {
            let menu = sorted_by_start_date(&manifest.tracks, true);
            let labels: Vec<&str> = menu.iter().map(|t| t.track_name.as_str()).collect();
            let picked = StdPrompter::stdio().multi_select("Choose tracks", &labels).await?;
            picked.into_iter().map(|i| menu[i]).collect()
        };

        Ok(upload_order(&manifest.tracks, &chosen))
    }

    /// Print public URLs and the summary, then purge the CDN for what was uploaded
    async fn report_published(&self, summary: &RunSummary, skip_purge: bool) {
        if !summary.published.is_empty() {
            println!("\nUploaded:");
            for remote in &summary.published {
                println!("  {}", remote.location);
            }
        }
        println!("\n{}", summary);

        let paths = summary.purge_paths();
        if skip_purge || paths.is_empty() {
            return;
        }

        let purger = CdnPurger::new(self.config().cdn_config.clone());
        if !purger.enabled() {
            return;
        }
        println!("Purging CDN cache...");
        match purger.purge(&paths).await {
            Ok(()) => println!("CDN cache purged."),
            Err(e) => {
                tracing::warn!("CDN purge failed: {}", e);
                eprintln!("CDN purge failed, uploads are still in place: {}", e);
            }
        }
    }
}

/// Everything, into the OneDrive library layout
fn admin_selection(config: &Config) -> DownloadSelection {
    DownloadSelection {
        formats: AudioFormat::ALL.to_vec(),
        variants: VariantChoice::Both.variants(),
        destination: Destination::AdminLibrary(config.onedrive_directory.clone()),
    }
}

/// ALAC is listed first on macOS, where it is the native choice
fn format_menu() -> Vec<(FormatChoice, &'static str)> {
    let mut menu = vec![
        (FormatChoice::Flac, "FLAC"),
        (FormatChoice::Alac, "ALAC (Apple Lossless)"),
        (FormatChoice::Both, "Both"),
    ];
    if cfg!(target_os = "macos") {
        menu.swap(0, 1);
    }
    menu
}

/// Remote name and formats for an uploaded master. An explicit name with a
/// `.flac` or `.m4a` extension narrows the upload to that format.
fn upload_target(input: &Path, name: Option<&str>, flac_only: bool, alac_only: bool) -> (String, Vec<AudioFormat>) {
    let flagged = if flac_only {
        vec![AudioFormat::Flac]
    } else if alac_only {
        vec![AudioFormat::Alac]
    } else {
        AudioFormat::ALL.to_vec()
    };

    match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => {
            let as_path = Path::new(name);
            let format = as_path
                .extension()
                .and_then(|e| e.to_str())
                .and_then(AudioFormat::from_extension);
            match (format, as_path.file_stem().and_then(|s| s.to_str())) {
                (Some(format), Some(stem)) => (stem.to_string(), vec![format]),
                _ => (name.to_string(), flagged),
            }
        }
        None => {
            let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
            (Utils::upload_name(stem), flagged)
        }
    }
}

/// Remote name of a hosted track: the stem of its current file
fn blob_name_for(track: &TrackMetadata) -> String {
    track
        .url_stem()
        .map(str::to_string)
        .unwrap_or_else(|| Utils::upload_name(&track.track_name))
}

/// 1-based position in the canonical order
fn position_of(manifest: &Manifest, track: &TrackMetadata) -> usize {
    manifest
        .tracks
        .iter()
        .position(|t| std::ptr::eq(t, track))
        .map_or(1, |i| i + 1)
}

/// `chosen` reordered oldest first, duplicates dropped
fn upload_order<'m>(tracks: &'m [TrackMetadata], chosen: &[&TrackMetadata]) -> Vec<&'m TrackMetadata> {
    sorted_by_start_date(tracks, false)
        .into_iter()
        .filter(|t| chosen.iter().any(|c| std::ptr::eq(*c, *t)))
        .collect()
}

fn publish_request(
    track: &TrackMetadata,
    album: &AlbumInfo,
    format: AudioFormat,
    blob_name: String,
    caption: Option<String>,
) -> PublishRequest {
    PublishRequest {
        track_name: track.track_name.clone(),
        title: track.display_name(TrackVariant::Original).into_owned(),
        performer: album.artist_name.clone(),
        format,
        blob_name,
        duration_secs: None,
        caption,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("evremixes").chain(args.iter().copied())).unwrap()
    }

    fn track(name: &str, date: &str) -> TrackMetadata {
        TrackMetadata {
            track_name: name.to_string(),
            file_url: format!("https://files.example.com/ev/{}.flac", name.replace(' ', "-")),
            start_date: Some(date.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_no_subcommand_means_download() {
        let cli = parse(&[]);
        assert!(cli.command.is_none());
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_download_flags() {
        let cli = parse(&["download", "--format", "both", "--variant", "instrumental", "--path", "/tmp/ev", "-vv"]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Some(Commands::Download(args)) => {
                assert_eq!(args.format, Some(FormatChoice::Both));
                assert_eq!(args.variant, Some(VariantChoice::Instrumental));
                assert_eq!(args.path, Some(PathBuf::from("/tmp/ev")));
                assert!(!args.admin);
                assert!(!args.no_open);
            }
            other => panic!("unexpected command: {:?}", other),
        }

        match parse(&["download", "--admin", "--no-open"]).command {
            Some(Commands::Download(args)) => assert!(args.admin && args.no_open),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_conflicting_flags_are_rejected() {
        let base = ["evremixes"];
        let with = |extra: &[&'static str]| base.iter().copied().chain(extra.iter().copied()).collect::<Vec<_>>();

        assert!(Cli::try_parse_from(with(&["upload", "a.wav", "--flac-only", "--alac-only"])).is_err());
        assert!(Cli::try_parse_from(with(&["telegram", "--all", "--track", "Lithium"])).is_err());
        assert!(Cli::try_parse_from(with(&["download", "--instrumentals", "--variant", "both"])).is_err());
    }

    #[test]
    fn test_publish_commands_parse() {
        match parse(&["reupload", "-t", "Lithium", "--track", "Haunted", "--skip-purge"]).command {
            Some(Commands::Reupload { selection, format, skip_purge }) => {
                assert_eq!(selection.tracks, vec!["Lithium", "Haunted"]);
                assert_eq!(format, FormatChoice::Both);
                assert!(skip_purge);
            }
            other => panic!("unexpected command: {:?}", other),
        }

        match parse(&["--config", "/tmp/ev.toml", "upload", "Lithium 1.0.2.wav", "Lithium.m4a"]).command {
            Some(Commands::Upload { input, name, .. }) => {
                assert_eq!(input, PathBuf::from("Lithium 1.0.2.wav"));
                assert_eq!(name.as_deref(), Some("Lithium.m4a"));
            }
            other => panic!("unexpected command: {:?}", other),
        }

        assert!(matches!(
            parse(&["config", "path"]).command,
            Some(Commands::Config { command: ConfigCommands::Path })
        ));
    }

    #[test]
    fn test_upload_target_names_and_formats() {
        let master = Path::new("/masters/Bring Me To Life 2.1.0_3.wav");

        let (name, formats) = upload_target(master, None, false, false);
        assert_eq!(name, "Bring-Me-To-Life");
        assert_eq!(formats, AudioFormat::ALL.to_vec());

        let (name, formats) = upload_target(master, Some("Lithium.m4a"), false, false);
        assert_eq!(name, "Lithium");
        assert_eq!(formats, vec![AudioFormat::Alac]);

        let (name, formats) = upload_target(master, Some("Lithium"), true, false);
        assert_eq!(name, "Lithium");
        assert_eq!(formats, vec![AudioFormat::Flac]);
    }

    #[test]
    fn test_upload_order_is_oldest_first() {
        let tracks = vec![
            track("Lithium", "2023-05-01"),
            track("Haunted", "2021-01-10"),
            track("Whisper", "2024-02-20"),
        ];
        let chosen = vec![&tracks[2], &tracks[0], &tracks[1], &tracks[0]];
        let names: Vec<&str> = upload_order(&tracks, &chosen)
            .iter()
            .map(|t| t.track_name.as_str())
            .collect();
        assert_eq!(names, vec!["Haunted", "Lithium", "Whisper"]);
    }

    #[test]
    fn test_admin_selection_covers_everything() {
        let config = Config {
            onedrive_directory: PathBuf::from("/od"),
            ..Default::default()
        };
        let selection = admin_selection(&config);
        assert_eq!(selection.formats.len(), 2);
        assert_eq!(selection.variants, vec![TrackVariant::Original, TrackVariant::Instrumental]);
        assert_eq!(selection.destination, Destination::AdminLibrary(PathBuf::from("/od")));
    }

    #[test]
    fn test_helpers_use_manifest_order_and_file_names() {
        let manifest = Manifest {
            metadata: AlbumInfo::default(),
            tracks: vec![track("Lithium", "2023"), track("Bring Me To Life", "2022")],
        };
        assert_eq!(position_of(&manifest, &manifest.tracks[1]), 2);
        assert_eq!(blob_name_for(&manifest.tracks[1]), "Bring-Me-To-Life");
        assert!(format_menu().iter().any(|(choice, _)| *choice == FormatChoice::Both));
    }
}
