use clap::{Parser, Subcommand};
use inkwell_backend::config::Config;
use inkwell_backend::models::db_operations::{groups_db_operations, users_db_operations};
use inkwell_backend::setup::db_setup;
use rand::RngCore;
use rusqlite::Connection;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "setup_cli", author, version, about = "A CLI for initial application setup.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the .env configuration file. Required by every command except `key generate`.
    #[arg(long, global = true, value_name = "FILE")]
    env_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
    Group {
        #[command(subcommand)]
        action: GroupAction,
    },
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },
}

#[derive(Subcommand, Debug)]
enum DbAction {
    Setup,
}

#[derive(Subcommand, Debug)]
enum GroupAction {
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        slug: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    List,
    Delete {
        #[arg(long)]
        slug: String,
    },
}

#[derive(Subcommand, Debug)]
enum UserAction {
    /// Removes the account together with its posts, comments and follows.
    Delete {
        #[arg(long)]
        username: String,
    },
}

#[derive(Subcommand, Debug)]
enum KeyAction {
    /// Prints a fresh SESSION_SECRET_KEY value.
    Generate,
}

fn main() {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    let cli = Cli::parse();

    if let Commands::Key { action: KeyAction::Generate } = &cli.command {
        println!("{}", generate_session_key());
        return;
    }

    let env_file = match &cli.env_file {
        Some(path) => path,
        None => {
            eprintln!("❌ Error: --env-file <FILE> is required for this command.");
            std::process::exit(2);
        }
    };
    let config = Config::from_env(env_file)
        .expect("FATAL: Failed to load or parse configuration.");

    match &cli.command {
        Commands::Db { action: DbAction::Setup } => setup_blog_database(&config),
        Commands::Group { action } => match action {
            GroupAction::Create { title, slug, description } => create_group(&config, title, slug, description),
            GroupAction::List => list_groups(&config),
            GroupAction::Delete { slug } => delete_group(&config, slug),
        },
        Commands::User { action: UserAction::Delete { username } } => delete_user(&config, username),
        Commands::Key { .. } => unreachable!("handled before configuration is loaded"),
    }
}

fn generate_session_key() -> String {
    let mut key = [0u8; 64];
    rand::thread_rng().fill_bytes(&mut key);
    hex::encode(key)
}

fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty() && slug.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_')
}

fn setup_blog_database(config: &Config) {
    let db_path = config.blog_db_path();
    println!("\nSetting up blog database at '{}'...", db_path.display());

    let mut conn = match db_setup::create_db_file(&db_path) {
        Ok(conn) => conn,
        Err(e) => {
            eprintln!("❌ Error creating blog database file: {}", e);
            return;
        }
    };
    match db_setup::setup_blog_db(&mut conn) {
        Ok(_) => println!("✅ Blog database setup completed successfully."),
        Err(e) => eprintln!("❌ Error setting up blog database: {}", e),
    }
}

fn open_existing(config: &Config) -> Option<Connection> {
    let db_path = config.blog_db_path();
    if !db_path.exists() {
        eprintln!("❌ Error: Blog database not found at '{}'. Please run `setup_cli db setup` first.", db_path.display());
        return None;
    }
    let conn = Connection::open(&db_path).expect("Could not open blog database.");
    db_setup::enable_foreign_keys(&conn).expect("Could not enable foreign keys.");
    Some(conn)
}

fn create_group(config: &Config, title: &str, slug: &str, description: &str) {
    if title.trim().is_empty() || !is_valid_slug(slug) {
        eprintln!("❌ Error: A title is required and the slug may only contain letters, numbers, hyphens and underscores.");
        return;
    }
    let Some(conn) = open_existing(config) else { return };
    match groups_db_operations::create_group(&conn, title.trim(), slug, description.trim()) {
        Ok(id) => println!("✅ Group '{}' created with id {} at /group/{}/", title.trim(), id, slug),
        Err(e) => eprintln!("❌ Error creating group: {}. The slug might already be taken.", e),
    }
}

fn list_groups(config: &Config) {
    let Some(conn) = open_existing(config) else { return };
    match groups_db_operations::read_all_groups(&conn) {
        Ok(groups) if groups.is_empty() => println!("No groups yet."),
        Ok(groups) => {
            println!("Listing Groups:");
            for group in groups {
                println!("- [{}] {} (/group/{}/)", group.id, group, group.slug);
            }
        }
        Err(e) => eprintln!("❌ Error fetching groups: {}", e),
    }
}

fn delete_group(config: &Config, slug: &str) {
    let Some(conn) = open_existing(config) else { return };
    match groups_db_operations::delete_group_by_slug(&conn, slug) {
        Ok(0) => eprintln!("❌ Error: No group with slug '{}' found.", slug),
        Ok(_) => println!("✅ Group '{}' deleted. Its posts were kept without a group.", slug),
        Err(e) => eprintln!("❌ Error deleting group: {}", e),
    }
}

fn delete_user(config: &Config, username: &str) {
    let Some(conn) = open_existing(config) else { return };
    let user = match users_db_operations::read_user_by_username(&conn, username) {
        Ok(Some(user)) => user,
        Ok(None) => {
            eprintln!("❌ Error: No user named '{}' found.", username);
            return;
        }
        Err(e) => {
            eprintln!("❌ Error looking up user: {}", e);
            return;
        }
    };
    match users_db_operations::delete_user(&conn, user.id) {
        Ok(_) => println!("✅ User '{}' deleted along with their posts, comments and follows.", username),
        Err(e) => eprintln!("❌ Error deleting user: {}", e),
    }
}
