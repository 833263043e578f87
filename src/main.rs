use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use tunebox::{
    ClientStateStore, Config, HttpApiClient, Playlist, SessionStatus, Song, SongList, UserIdMatch,
};

#[derive(Parser)]
#[command(name = "tunebox")]
#[command(about = "Client for the Tunebox music-list service")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pick one entry at random from names given on the command line
    Pick {
        /// Song names to choose between
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// List the songs on your list
    Songs,

    /// Add a song to your list
    AddSong {
        /// Display name of the song
        name: String,
    },

    /// Pick one of your songs at random
    Random,

    /// List your playlists
    Playlists,

    /// List public playlists
    PublicPlaylists,

    /// Create a new playlist
    CreatePlaylist {
        /// Playlist name
        name: String,

        /// Make the playlist publicly visible
        #[arg(long)]
        public: bool,
    },

    /// Add a song to one of your playlists
    AddToPlaylist {
        /// Target playlist id
        playlist_id: String,

        /// Display name of the song
        name: String,
    },

    /// List stored song records, optionally filtered by user id
    Stored {
        /// Filter records by user id
        #[arg(long)]
        user: Option<String>,

        /// Match the user id exactly (case-insensitive) instead of by substring
        #[arg(long)]
        exact: bool,

        /// Print the matching records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show setup guide
    Setup,
}

fn setup_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_tracing(cli.verbose);

    match cli.command {
        Commands::Pick { names } => {
            pick_local(&names);
        }
        Commands::Songs => {
            list_songs().await?;
        }
        Commands::AddSong { name } => {
            add_song(&name).await?;
        }
        Commands::Random => {
            random_song().await?;
        }
        Commands::Playlists => {
            list_playlists().await?;
        }
        Commands::PublicPlaylists => {
            list_public_playlists().await?;
        }
        Commands::CreatePlaylist { name, public } => {
            create_playlist(&name, public).await?;
        }
        Commands::AddToPlaylist { playlist_id, name } => {
            add_to_playlist(&playlist_id, &name).await?;
        }
        Commands::Stored { user, exact, json } => {
            list_stored(user.as_deref(), exact, json).await?;
        }
        Commands::Setup => {
            show_setup_guide();
        }
    }

    Ok(())
}

fn pick_local(names: &[String]) {
    let mut list = SongList::new();

    for name in names {
        if !list.add(name) {
            println!("{}", format!("Skipped (empty or duplicate): {}", name).yellow());
        }
    }

    match list.select_random() {
        Some(song) => println!("{} {}", "Picked:".green().bold(), song.name),
        None => println!("{}", "Nothing to pick from".yellow()),
    }
}

/// Builds the store for an authenticated command: load config, sign in with
/// the configured identity, and sync user data from the API.
async fn open_store(match_rule: UserIdMatch) -> Result<ClientStateStore> {
    let config = Config::from_env().context("Failed to load configuration")?;

    let missing = config.get_missing_config();
    if !missing.is_empty() {
        println!("{}", "Missing configuration:".red());
        for item in &missing {
            println!("   - {}", item);
        }
        println!(
            "\n{}",
            "Please copy .env.example to .env and fill in your credentials.".yellow()
        );
        std::process::exit(1);
    }

    let api = HttpApiClient::new(&config).context("Failed to create API client")?;
    let store = ClientStateStore::new(Arc::new(api), match_rule);

    let user = config
        .session_user()
        .context("TUNEBOX_USER_ID is not set")?;

    store.set_session(SessionStatus::Authenticated(user)).await;

    let spinner = loading_spinner("Loading your music...");
    store.load_user_data().await;
    spinner.finish_and_clear();

    print_banner(&store).await;

    Ok(store)
}

fn loading_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

async fn print_banner(store: &ClientStateStore) {
    if let Some(banner) = store.error_banner().await {
        println!("{}", banner.red());
    }
}

async fn list_songs() -> Result<()> {
    println!("{}", "Your Songs".cyan().bold());
    println!("{}", "=".repeat(50));

    let store = open_store(UserIdMatch::Substring).await?;
    let songs = store.songs().await;

    if songs.is_empty() {
        println!("{}", "No songs on your list yet".yellow());
        return Ok(());
    }

    for (i, song) in songs.iter().enumerate() {
        match &song.artist {
            Some(artist) => println!("{:2}. {} - {}", i + 1, song.name.green(), artist),
            None => println!("{:2}. {}", i + 1, song.name.green()),
        }
    }

    println!("\n{}", format!("Total: {} songs", songs.len()).cyan());

    Ok(())
}

async fn add_song(name: &str) -> Result<()> {
    let store = open_store(UserIdMatch::Substring).await?;

    if store.add_song(name).await {
        println!("{} {}", "Added:".green(), name.trim());
    } else {
        print_banner(&store).await;
        println!("{}", "Song was not added".yellow());
    }

    Ok(())
}

async fn random_song() -> Result<()> {
    let store = open_store(UserIdMatch::Substring).await?;

    match store.select_random_song().await {
        Some(song) => println!("{} {}", "Picked:".green().bold(), song.name),
        None => println!("{}", "Your list is empty".yellow()),
    }

    Ok(())
}

async fn list_playlists() -> Result<()> {
    println!("{}", "Your Playlists".cyan().bold());
    println!("{}", "=".repeat(50));

    let store = open_store(UserIdMatch::Substring).await?;
    print_playlists(&store.playlists().await);

    Ok(())
}

/// Public playlists are visible without signing in, so this skips the
/// session setup entirely.
async fn list_public_playlists() -> Result<()> {
    println!("{}", "Public Playlists".cyan().bold());
    println!("{}", "=".repeat(50));

    let config = Config::from_env().context("Failed to load configuration")?;
    let api = HttpApiClient::new(&config).context("Failed to create API client")?;
    let store = ClientStateStore::new(Arc::new(api), UserIdMatch::Substring);

    let spinner = loading_spinner("Loading public playlists...");
    store.load_public_playlists().await;
    spinner.finish_and_clear();
    print_banner(&store).await;

    print_playlists(&store.public_playlists().await);

    Ok(())
}

fn print_playlists(playlists: &[Playlist]) {
    if playlists.is_empty() {
        println!("{}", "No playlists found".yellow());
        return;
    }

    for (i, playlist) in playlists.iter().enumerate() {
        let visibility = if playlist.is_public { "public" } else { "private" };
        println!(
            "{:2}. {} ({} songs, {})",
            i + 1,
            playlist.name.green(),
            playlist.songs.len(),
            visibility
        );
        if let Some(owner) = &playlist.user_name {
            println!("     by {}", owner.cyan());
        }
        println!("     id: {}", playlist.id);
    }
}

async fn create_playlist(name: &str, public: bool) -> Result<()> {
    let store = open_store(UserIdMatch::Substring).await?;

    if store.create_playlist(name, public).await {
        println!("{} {}", "Created playlist:".green(), name.trim());
    } else {
        print_banner(&store).await;
        println!("{}", "Playlist was not created".yellow());
    }

    Ok(())
}

async fn add_to_playlist(playlist_id: &str, name: &str) -> Result<()> {
    let store = open_store(UserIdMatch::Substring).await?;

    let name = name.trim();
    if name.is_empty() {
        println!("{}", "Song name must not be empty".yellow());
        return Ok(());
    }

    if store
        .add_to_playlist(playlist_id, Song::with_name(name))
        .await
    {
        println!("{} {}", "Added to playlist:".green(), name);
    } else {
        print_banner(&store).await;
        println!("{}", "Song was not added to the playlist".yellow());
    }

    Ok(())
}

async fn list_stored(user: Option<&str>, exact: bool, json: bool) -> Result<()> {
    let match_rule = if exact {
        UserIdMatch::ExactIgnoreCase
    } else {
        UserIdMatch::Substring
    };

    let store = open_store(match_rule).await?;
    let records = store.filter_stored_songs(user.unwrap_or("")).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    println!("{}", "Stored Songs".cyan().bold());
    println!("{}", "=".repeat(50));

    if records.is_empty() {
        println!("{}", "No stored songs found".yellow());
        return Ok(());
    }

    for record in &records {
        println!(
            "{}  {}  {}",
            record.user_id.cyan(),
            record.name.green(),
            record.stored_at
        );
    }

    println!("\n{}", format!("Total: {} records", records.len()).cyan());

    Ok(())
}

fn show_setup_guide() {
    println!("{}", "Tunebox Client Setup Guide".cyan().bold());
    println!("{}", "=".repeat(50));

    println!("\n{}", "1. Server".yellow());
    println!("   - Ask your Tunebox administrator for the API base URL");
    println!("   - Request an API token for your account");

    println!("\n{}", "2. Configuration".yellow());
    println!("   - Create a .env file with:");
    println!("     TUNEBOX_API_URL=http://127.0.0.1:3000");
    println!("     TUNEBOX_API_TOKEN=your_api_token");
    println!("     TUNEBOX_USER_ID=your_user_id");
    println!("     TUNEBOX_USER_NAME=Your Name");

    println!("\n{}", "3. Usage".yellow());
    println!("   - tunebox songs                      (list your songs)");
    println!("   - tunebox add-song \"Imagine\"         (add a song)");
    println!("   - tunebox random                     (pick one at random)");
    println!("   - tunebox playlists                  (list your playlists)");
    println!("   - tunebox create-playlist \"Mix\"      (create a playlist)");
    println!("   - tunebox stored --user u1           (search stored songs)");
    println!("   - tunebox pick \"A\" \"B\" \"C\"           (offline random pick)");

    println!("\n{}", "Ready to go!".green());
}
