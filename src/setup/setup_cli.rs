use clap::{Parser, Subcommand};
use kkn_site::config::Config;
use kkn_site::models::db_operations::profiles_db_operations;
use kkn_site::models::Role;
use kkn_site::setup::db_setup;
use rusqlite::Connection;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "setup_cli", author, version, about = "A CLI for initial site setup.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the .env configuration file.
    #[arg(long, required = true, value_name = "FILE")]
    env_file: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand, Debug)]
enum DbAction {
    /// Creates site.db with every table and the default settings.
    Setup,
}

#[derive(Subcommand, Debug)]
enum AdminAction {
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    List,
    ChangePassword {
        #[arg(long)]
        email: String,
        #[arg(long)]
        new_password: String,
    },
    /// Grants the admin role to an existing account.
    Promote {
        #[arg(long)]
        email: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = Config::from_env(&cli.env_file).expect("FATAL: Failed to load or parse configuration.");

    match &cli.command {
        Commands::Db { action } => match action {
            DbAction::Setup => setup_site_database(&config),
        },
        Commands::Admin { action } => match action {
            AdminAction::Create { name, email, password } => create_admin(&config, name, email, password),
            AdminAction::List => list_admins(&config),
            AdminAction::ChangePassword { email, new_password } => change_admin_password(&config, email, new_password),
            AdminAction::Promote { email } => promote_to_admin(&config, email),
        },
    }
}

fn open_site_db(config: &Config) -> Option<Connection> {
    let db_path = config.site_db_path();
    if !db_path.exists() {
        eprintln!(
            "❌ Error: Site database not found at '{}'. Please run `setup_cli db setup` first.",
            db_path.display()
        );
        return None;
    }
    match Connection::open(&db_path) {
        Ok(conn) => match conn.execute_batch("PRAGMA foreign_keys = ON;") {
            Ok(()) => Some(conn),
            Err(e) => {
                eprintln!("❌ Error configuring site database: {}", e);
                None
            }
        },
        Err(e) => {
            eprintln!("❌ Error opening site database: {}", e);
            None
        }
    }
}

fn setup_site_database(config: &Config) {
    let db_path = config.site_db_path();
    if db_path.exists() {
        println!("ℹ️ Site database already exists at '{}'. Skipping creation.", db_path.display());
        return;
    }
    println!("\nSetting up site database at '{}'...", db_path.display());

    if let Some(parent_dir) = db_path.parent() {
        if let Err(e) = fs::create_dir_all(parent_dir) {
            eprintln!("❌ Error: Could not create database directory: {}", e);
            return;
        }
    }

    let mut conn = match Connection::open(&db_path) {
        Ok(conn) => conn,
        Err(e) => {
            eprintln!("❌ Error: Could not create site database file: {}", e);
            return;
        }
    };
    match db_setup::setup_site_db(&mut conn) {
        Ok(_) => println!("✅ Site database setup completed successfully."),
        Err(e) => eprintln!("❌ Error setting up site database: {}", e),
    }
}

fn create_admin(config: &Config, name: &str, email: &str, password: &str) {
    let Some(mut conn) = open_site_db(config) else { return };

    match profiles_db_operations::create_account_with_profile(&mut conn, name, email, password, Role::Admin, true) {
        Ok(id) => println!("✅ Admin '{}' <{}> created successfully (id {}).", name, email, id),
        Err(e) if e.is_unique_violation() => eprintln!("❌ Error: An account with email '{}' already exists.", email),
        Err(e) => eprintln!("❌ Error creating admin: {}", e),
    }
}

fn list_admins(config: &Config) {
    let Some(conn) = open_site_db(config) else { return };

    match profiles_db_operations::read_all_profiles(&conn) {
        Ok(profiles) => {
            println!("Listing Admins:");
            for profile in profiles.iter().filter(|p| p.is_admin()) {
                println!("- {} <{}>", profile.name, profile.email);
            }
        }
        Err(e) => eprintln!("❌ Error fetching admins: {}", e),
    }
}

fn change_admin_password(config: &Config, email: &str, new_password: &str) {
    let Some(conn) = open_site_db(config) else { return };

    match profiles_db_operations::read_profile_by_email(&conn, email) {
        Ok(Some(profile)) if profile.is_admin() => {}
        Ok(_) => {
            eprintln!("❌ Error: No admin with email '{}' found.", email);
            return;
        }
        Err(e) => {
            eprintln!("❌ Error looking up admin: {}", e);
            return;
        }
    }

    match profiles_db_operations::update_password(&conn, email, new_password) {
        Ok(0) => eprintln!("❌ Error: No account with email '{}' found.", email),
        Ok(_) => println!("✅ Password for admin '{}' changed successfully.", email),
        Err(e) => eprintln!("❌ Error updating password: {}", e),
    }
}

fn promote_to_admin(config: &Config, email: &str) {
    let Some(conn) = open_site_db(config) else { return };

    match profiles_db_operations::update_role_by_email(&conn, email, Role::Admin) {
        Ok(0) => eprintln!("❌ Error: No profile with email '{}' found.", email),
        Ok(_) => println!("✅ '{}' is now an admin.", email),
        Err(e) => eprintln!("❌ Error updating role: {}", e),
    }
}
