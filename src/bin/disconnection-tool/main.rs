use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Args as ClapArgs, Parser};

use disconnection::admin::{AdminService, ManageFilter, NewPost};
use disconnection::auth::Session;
use disconnection::category::Category;
use disconnection::config::read_config;
use disconnection::post::{PostId, PostKey};
use disconnection::server::Services;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Config path
    #[arg(short, long, default_value = "disconnection.toml")]
    config_path: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Lists posts of every category
    List(ListArgs),
    /// Creates a post
    Create(CreateArgs),
    /// Deletes a post
    Delete(DeleteArgs),
}

#[derive(ClapArgs, Debug)]
struct ListArgs {
    /// Only this category. Lists all of them if empty
    #[arg(long)]
    category: Option<Category>,

    /// Case insensitive title search
    #[arg(short, long, default_value = "")]
    search: String,
}

#[derive(ClapArgs, Debug)]
struct Credentials {
    #[arg(short, long)]
    email: String,

    #[arg(short, long)]
    password: String,
}

#[derive(ClapArgs, Debug)]
struct CreateArgs {
    #[command(flatten)]
    credentials: Credentials,

    #[arg(long)]
    category: Category,

    #[arg(short, long)]
    title: String,

    #[arg(short, long, default_value = "")]
    description: String,

    /// Display date, YYYY-MM-DD. Today if empty
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Image file uploaded to the image host
    #[arg(short, long)]
    image: Option<PathBuf>,
}

#[derive(ClapArgs, Debug)]
struct DeleteArgs {
    #[command(flatten)]
    credentials: Credentials,

    #[arg(long)]
    category: Category,

    #[arg(long)]
    id: String,
}

async fn sign_in(services: &Services, credentials: &Credentials) -> Result<Session> {
    services.auth.sign_in(&credentials.email, &credentials.password).await
        .map_err(|e| anyhow!("Sign in failed: {}", e))
}

#[ntex::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = read_config(&PathBuf::from(&args.config_path))?;
    let services = Services::from_config(&config);
    let admin = AdminService::new(services.store.as_ref(), services.uploader.as_ref(), config.backend.sort_order);

    match args.command {
        Command::List(list_args) => {
            let filter = ManageFilter { category: list_args.category, search: list_args.search };
            let list = admin.list(&filter).await;
            for post in list.posts.iter() {
                println!("{:<10} {:<8} {}", post.category, post.id, post.title);
            }
            println!("Showing {} of {} posts", list.posts.len(), list.total);
        }
        Command::Create(create_args) => {
            let image = match create_args.image {
                Some(ref path) => Some(fs::read(path)
                    .with_context(|| format!("Error reading image {}", path.display()))?),
                None => None,
            };
            let session = sign_in(&services, &create_args.credentials).await?;
            let new_post = NewPost {
                title: create_args.title,
                description: create_args.description,
                category: create_args.category,
                display_date: create_args.date.unwrap_or_else(|| Utc::now().date_naive()),
                image,
            };
            admin.create(&session, new_post).await?;
            println!("Post added successfully!");
        }
        Command::Delete(delete_args) => {
            let key = PostKey { category: delete_args.category, id: PostId::parse(&delete_args.id) };
            let Some(post) = admin.find(&key).await else {
                return Err(anyhow!("Post {} not found", key));
            };
            let session = sign_in(&services, &delete_args.credentials).await?;
            admin.delete(&session, &key).await?;
            println!("Deleted {}: {}", key, post.title);
        }
    }

    Ok(())
}
