use std::fmt;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use playmusic::query::{self, Order, SearchField};
use playmusic::{
    AppConfig, BackendKind, LibraryTree, NodeId, PlaybackEngine, SessionContext, TickOutcome,
    TrackList,
};
use playmusic_api::auth::SessionCache;
use playmusic_api::device::mobile_devices;
use playmusic_api::{Credentials, Device, GatewayClient, MusicService, choose_device};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "playmusic",
    version,
    about = "Browse, play and download a cloud music library"
)]
struct Cli {
    /// Account gateway base URL
    #[arg(long, global = true, value_name = "URL")]
    gateway: Option<String>,
    /// Device to stream through (id or friendly name)
    #[arg(long, global = true, value_name = "ID")]
    device: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in and cache the session token
    Login {
        #[arg(short, long)]
        username: Option<String>,
        /// Check current login status
        #[arg(long)]
        check: bool,
    },
    /// Clear saved session
    Logout,
    /// List registered devices
    Devices,
    /// Print the library as artist / album / track
    Tree {
        /// Only this artist
        #[arg(long)]
        artist: Option<String>,
    },
    /// Download artists, albums or tracks as tagged MP3 files
    Download {
        #[arg(long)]
        artist: Vec<String>,
        #[arg(long, value_name = "ARTIST/ALBUM")]
        album: Vec<String>,
        /// Track id (as printed by `tree`)
        #[arg(long)]
        track: Vec<String>,
        /// Output directory
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Play a search, playlist or station
    Play {
        /// Media backend: vlc or native
        backend: Option<String>,
        #[command(flatten)]
        source: Source,
        #[arg(long)]
        shuffle: bool,
    },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct Source {
    /// Search artists
    #[arg(long, value_name = "TERMS")]
    artist: Option<String>,
    /// Search genres
    #[arg(long, value_name = "TERMS")]
    genre: Option<String>,
    /// Search albums
    #[arg(long, value_name = "TERMS")]
    album: Option<String>,
    /// Search titles
    #[arg(long, value_name = "TERMS")]
    title: Option<String>,
    #[arg(long, value_name = "NAME")]
    playlist: Option<String>,
    #[arg(long, value_name = "NAME")]
    station: Option<String>,
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let mut config = AppConfig::load().context("failed to load config")?;
    if let Some(url) = cli.gateway {
        config.gateway_url = url;
    }
    if let Some(device) = cli.device {
        config.device_id = Some(device);
    }

    let result = match cli.command {
        Command::Login { username, check } => cmd_login(&config, username, check),
        Command::Logout => cmd_logout(),
        Command::Devices => cmd_devices(&config),
        Command::Tree { artist } => cmd_tree(&config, artist.as_deref()),
        Command::Download {
            artist,
            album,
            track,
            output,
        } => cmd_download(&config, &artist, &album, &track, output),
        Command::Play {
            backend,
            source,
            shuffle,
        } => cmd_play(&config, backend.as_deref(), &source, shuffle),
    };
    finish(result)
}

/// A prompt was closed with EOF.
#[derive(Debug)]
struct Cancelled;

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("cancelled")
    }
}

impl std::error::Error for Cancelled {}

/// Cancelling at a prompt is a clean exit, not a failure.
fn finish(result: Result<()>) -> Result<()> {
    match result {
        Err(e) if e.is::<Cancelled>() => {
            println!("Cancelled.");
            Ok(())
        }
        other => other,
    }
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("playmusic=info,warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

// ── session ──

fn prompt(label: &str) -> Result<Option<String>> {
    print!("{label}");
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_owned()))
}

/// Ask for credentials until the gateway accepts them.
fn login_interactive(config: &AppConfig, username: Option<String>) -> Result<GatewayClient> {
    let mut default = username;
    loop {
        let label = match &default {
            Some(u) => format!("Username [{u}]: "),
            None => "Username: ".to_owned(),
        };
        let Some(entered) = prompt(&label)? else {
            return Err(Cancelled.into());
        };
        let username = match (entered.trim(), &default) {
            ("", Some(u)) => u.clone(),
            ("", None) => continue,
            (u, _) => u.to_owned(),
        };
        let Some(password) = prompt("Password: ")? else {
            return Err(Cancelled.into());
        };
        let credentials = Credentials {
            username: username.clone(),
            password,
        };
        match GatewayClient::login(&config.gateway_url, &credentials) {
            Ok(client) => {
                SessionCache {
                    username: Some(username),
                    token: Some(client.token().to_owned()),
                }
                .save()
                .context("failed to save session")?;
                return Ok(client);
            }
            Err(e) if e.is_auth() => {
                eprintln!("Login failed: {e}");
                default = Some(username);
            }
            Err(e) => return Err(e).context("login request failed"),
        }
    }
}

/// A client with a working session, plus the account's devices.
fn connect(config: &AppConfig) -> Result<(GatewayClient, Vec<Device>)> {
    let cache = SessionCache::load()?;
    if cache.is_logged_in() {
        let client = GatewayClient::with_session(&config.gateway_url, &cache)?;
        match client.devices() {
            Ok(devices) => return Ok((client, devices)),
            Err(e) if e.is_auth() => eprintln!("Session expired, please sign in again."),
            Err(e) => return Err(e).context("failed to list devices"),
        }
    }
    let client = login_interactive(config, cache.username)?;
    let devices = client.devices().context("failed to list devices")?;
    Ok((client, devices))
}

fn pick_device<'a>(config: &AppConfig, devices: &'a [Device]) -> Result<&'a Device> {
    let mobile = mobile_devices(devices);
    if config.device_id.is_some() || mobile.len() < 2 {
        return Ok(choose_device(devices, config.device_id.as_deref())?);
    }
    for (i, d) in mobile.iter().enumerate() {
        println!("  {i}) {} ({})", d.friendly_name, d.id);
    }
    loop {
        let Some(answer) = prompt("Device: ")? else {
            return Err(Cancelled.into());
        };
        if let Some(d) = answer.trim().parse::<usize>().ok().and_then(|i| mobile.get(i).copied()) {
            return Ok(d);
        }
    }
}

fn open_context(config: &AppConfig) -> Result<SessionContext> {
    let (client, devices) = connect(config)?;
    let device = pick_device(config, &devices)?;
    info!(device = %device.friendly_name, "streaming through device");
    let device_id = device.stream_id().to_owned();
    Ok(SessionContext::open(Box::new(client), device_id)?)
}

// ── login / logout / devices ──

fn cmd_login(config: &AppConfig, username: Option<String>, check: bool) -> Result<()> {
    if check {
        let cache = SessionCache::load()?;
        if !cache.is_logged_in() {
            println!("Not logged in.");
            return Ok(());
        }
        let client = GatewayClient::with_session(&config.gateway_url, &cache)?;
        let who = cache.username.as_deref().unwrap_or("unknown user");
        match client.devices() {
            Ok(devices) => println!("Logged in as: {who} ({} devices)", devices.len()),
            Err(e) => println!("Session exists but validation failed: {e}"),
        }
        return Ok(());
    }

    let username = username.or(SessionCache::load()?.username);
    login_interactive(config, username)?;
    println!("Session saved.");
    Ok(())
}

fn cmd_logout() -> Result<()> {
    SessionCache::clear()?;
    println!("Session cleared.");
    Ok(())
}

fn cmd_devices(config: &AppConfig) -> Result<()> {
    let (_, devices) = connect(config)?;
    if devices.is_empty() {
        println!("No devices registered.");
    }
    for d in &devices {
        let marker = if d.kind.is_mobile() { "*" } else { " " };
        println!("{marker} {:<24} {:?}  {}", d.friendly_name, d.kind, d.id);
    }
    Ok(())
}

// ── tree / download ──

fn cmd_tree(config: &AppConfig, artist: Option<&str>) -> Result<()> {
    let (client, _) = connect(config)?;
    let tracks = client.get_all_songs().context("failed to load library")?;
    let tree = LibraryTree::build(&tracks);

    let walk = match artist {
        Some(name) => {
            let id = tree.artist(name).with_context(|| format!("no artist named {name:?}"))?;
            tree.walk_from(&[id])
        }
        None => tree.walk(),
    };
    for (depth, id) in walk {
        let node = tree.node(id);
        let indent = "  ".repeat(depth);
        match node.track().and_then(playmusic_api::Track::identity) {
            Some(tid) => println!("{indent}{} [{tid}]", node.label()),
            None => println!("{indent}{}", node.label()),
        }
    }
    Ok(())
}

/// Album named `ARTIST/ALBUM`, or a root-level `ALBUM`. Either name may
/// itself contain `/`, so every split point is tried.
fn find_album(tree: &LibraryTree, wanted: &str) -> Option<NodeId> {
    wanted
        .match_indices('/')
        .find_map(|(i, _)| tree.album(Some(&wanted[..i]), &wanted[i + 1..]))
        .or_else(|| tree.album(None, wanted))
}

fn select(
    tree: &LibraryTree,
    artists: &[String],
    albums: &[String],
    tracks: &[String],
) -> Result<Vec<NodeId>> {
    let mut selection = Vec::new();
    for name in artists {
        let id = tree.artist(name).with_context(|| format!("no artist named {name:?}"))?;
        selection.push(id);
    }
    for wanted in albums {
        let id = find_album(tree, wanted).with_context(|| format!("no album {wanted:?}"))?;
        selection.push(id);
    }
    for id in tracks {
        let node = tree.find_track(id).with_context(|| format!("no track with id {id}"))?;
        selection.push(node);
    }
    Ok(selection)
}

fn cmd_download(
    config: &AppConfig,
    artists: &[String],
    albums: &[String],
    tracks: &[String],
    output: Option<PathBuf>,
) -> Result<()> {
    if artists.is_empty() && albums.is_empty() && tracks.is_empty() {
        bail!("nothing selected; use --artist, --album or --track");
    }
    let ctx = open_context(config)?;
    let tree = LibraryTree::build(ctx.library());
    let selection = select(&tree, artists, albums, tracks)?;
    let base = output
        .or_else(|| config.download_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));

    let mut progress = |p: &playmusic::Progress| {
        eprintln!("[{}/{}] {}", p.completed, p.total, p.message);
    };
    let report = playmusic::download_selection(&ctx, &tree, &selection, &base, &mut progress)?;

    for path in &report.written {
        println!("{}", path.display());
    }
    for failure in &report.failures {
        eprintln!("error: {}: {}", failure.title, failure.error);
    }
    println!(
        "{} downloaded, {} failed",
        report.written.len(),
        report.failures.len()
    );
    Ok(())
}

// ── play ──

fn resolve_source(
    ctx: &SessionContext,
    config: &AppConfig,
    source: &Source,
    shuffle: bool,
) -> Result<TrackList> {
    let order = if shuffle { Order::Shuffled } else { Order::Library };
    let searches = [
        (SearchField::Artist, &source.artist),
        (SearchField::Genre, &source.genre),
        (SearchField::Album, &source.album),
        (SearchField::Title, &source.title),
    ];
    if let Some((field, terms)) = searches.into_iter().find_map(|(f, t)| Some((f, t.as_ref()?))) {
        return Ok(query::search(ctx.library(), field, terms, order)?);
    }

    let list = if let Some(name) = &source.playlist {
        let playlists = ctx.service().get_all_user_playlist_contents()?;
        let playlist = query::visible_playlists(&playlists)
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .with_context(|| format!("no playlist named {name:?}"))?;
        query::playlist_tracks(ctx.library(), playlist)
    } else if let Some(name) = &source.station {
        let stations = ctx.service().get_all_stations()?;
        let station = stations
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
            .with_context(|| format!("no station named {name:?}"))?;
        query::station_tracks(ctx.service(), station, config.station_tracks)?
    } else {
        bail!("choose a search, --playlist or --station");
    };

    if !shuffle {
        return Ok(list);
    }
    let mut tracks = list.into_inner();
    query::arrange(&mut tracks, Order::Shuffled);
    Ok(TrackList::new(tracks))
}

const HELP: &str =
    "n next | b back | p pause | f/r SECS seek | s 0..1 seek | j INDEX jump | q quit";

fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines().map_while(std::result::Result::ok) {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn cmd_play(
    config: &AppConfig,
    backend: Option<&str>,
    source: &Source,
    shuffle: bool,
) -> Result<()> {
    let kind: BackendKind = match backend {
        Some(name) => name.parse()?,
        None => config.backend,
    };
    let ctx = open_context(config)?;
    let list = resolve_source(&ctx, config, source, shuffle)?;
    if list.is_empty() {
        println!("Nothing matched.");
        return Ok(());
    }
    for (i, t) in list.iter().enumerate() {
        println!("{i:>3}  {} - {}", t.artist, t.title);
    }
    println!("{HELP}");

    let backend = playmusic::open_backend(kind, config)?;
    let mut engine = PlaybackEngine::new(&ctx, backend, config.poll_interval());
    let token = engine.start(list)?;
    show(&engine);

    let commands = spawn_stdin_reader();
    let mut stdin_open = true;
    loop {
        let received = if stdin_open {
            commands.recv_timeout(config.poll_interval())
        } else {
            thread::sleep(config.poll_interval());
            Err(RecvTimeoutError::Timeout)
        };
        match received {
            Ok(line) => {
                if !run_command(&mut engine, line.trim()) {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => match engine.tick(token) {
                TickOutcome::Advanced(_) => show(&engine),
                TickOutcome::Stopped => {
                    println!("Playback stopped.");
                    break;
                }
                _ => {}
            },
            // Keep playing without a controller.
            Err(RecvTimeoutError::Disconnected) => stdin_open = false,
        }
    }
    engine.stop()?;
    Ok(())
}

fn show<B: playmusic::MediaBackend>(engine: &PlaybackEngine<'_, B>) {
    match engine.now_playing() {
        Some(now) => println!("{now}"),
        None => println!("Stopped."),
    }
}

/// Signed seconds for `f SECS` / `r SECS`; 10 when SECS is missing or bad.
fn seek_offset(cmd: &str, arg: &str) -> i64 {
    let secs: i64 = arg.parse().unwrap_or(10);
    if cmd == "r" { secs.saturating_neg() } else { secs }
}

/// Apply one control line; `false` means quit.
fn run_command<B: playmusic::MediaBackend>(engine: &mut PlaybackEngine<'_, B>, line: &str) -> bool {
    let (cmd, arg) = line.split_once(' ').unwrap_or((line, ""));
    let arg = arg.trim();
    let result = match cmd {
        "q" => return false,
        "" => Ok(()),
        "n" => engine.next().map(drop),
        "b" => engine.previous().map(drop),
        "p" => engine.toggle_pause().map(drop),
        "f" | "r" => engine.seek_relative(seek_offset(cmd, arg)).map(drop),
        "s" => match arg.parse::<f64>() {
            Ok(fraction) => engine.seek_fraction(fraction).map(drop),
            Err(_) => {
                eprintln!("usage: s 0..1");
                return true;
            }
        },
        "j" => match arg.parse::<usize>() {
            Ok(index) => engine.jump_to(index).map(drop),
            Err(_) => {
                eprintln!("usage: j INDEX");
                return true;
            }
        },
        _ => {
            println!("{HELP}");
            return true;
        }
    };
    if let Err(e) = result {
        warn!("{e}");
    }
    show(engine);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use playmusic_api::Track;

    fn track(id: &str, artist: &str, album: &str) -> Track {
        Track {
            id: Some(id.into()),
            title: id.into(),
            artist: artist.into(),
            album_artist: artist.into(),
            album: album.into(),
            ..Track::default()
        }
    }

    #[test]
    fn album_names_may_contain_slashes() {
        let tree = LibraryTree::build(&[
            track("1", "AC/DC", "Back in Black"),
            track("2", "", "A/B"),
            track("3", "X", "Y/Z"),
        ]);
        assert_eq!(
            find_album(&tree, "AC/DC/Back in Black"),
            tree.album(Some("AC/DC"), "Back in Black")
        );
        assert!(find_album(&tree, "AC/DC/Back in Black").is_some());
        assert_eq!(find_album(&tree, "A/B"), tree.album(None, "A/B"));
        assert!(find_album(&tree, "A/B").is_some());
        assert_eq!(find_album(&tree, "X/Y/Z"), tree.album(Some("X"), "Y/Z"));
        assert!(find_album(&tree, "X/Y/Z").is_some());
        assert!(find_album(&tree, "Nobody/Nothing").is_none());
    }

    #[test]
    fn seek_offsets() {
        assert_eq!(seek_offset("f", "30"), 30);
        assert_eq!(seek_offset("r", "30"), -30);
        assert_eq!(seek_offset("f", ""), 10);
        assert_eq!(seek_offset("r", "-9223372036854775808"), i64::MAX);
    }

    #[test]
    fn cancelled_prompt_exits_cleanly() {
        assert!(finish(Err(Cancelled.into())).is_ok());
        assert!(finish(Err(anyhow::anyhow!("boom"))).is_err());
        assert!(finish(Ok(())).is_ok());
    }
}
