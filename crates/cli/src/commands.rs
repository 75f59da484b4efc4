//! CLI commands

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use nutrilabel_core::{CalorieInfo, NutrientCategory, NutritionValue, ProductDetail};
use nutrilabel_http::client::bootstrap::extract_and_store_access_token;
use nutrilabel_http::{
    ClientConfig, FileCookieStore, FileTokenStore, Location, NutriClientBuilder, TokenStore,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Subcommand)]
pub enum Commands {
    /// Show the nutrition label of a product
    Product {
        /// Product ID
        id: i64,
    },

    /// Manage the stored access token
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },

    /// Store the access token carried in a login redirect address
    Bootstrap {
        /// Address the login flow redirected to, e.g. `https://app/?access_token=...`
        url: String,
    },

    /// Print the effective configuration
    Config,
}

#[derive(Subcommand)]
pub enum TokenCommands {
    /// Print the stored access token
    Show,
    /// Replace the stored access token
    Set {
        token: String,
    },
    /// Remove the stored access token (logout)
    Clear,
}

/// Product label as printed by `nutrilabel product`
#[derive(Serialize)]
struct ProductLabel<'a> {
    product: &'a ProductDetail,
    images: Vec<&'a str>,
    calories: Option<CalorieInfo>,
    nutrition: Vec<NutritionValue>,
    categories: Vec<NutrientCategory>,
}

impl Commands {
    /// Execute the command
    pub async fn execute(self, config: ClientConfig) -> Result<()> {
        match self {
            Self::Product { id } => {
                let store = token_store(&config)?;
                let cookies = FileCookieStore::open(storage_dir(&config)?)
                    .context("failed to open session cookies")?;
                let client = NutriClientBuilder::from_config(&config)
                    .token_store(store)
                    .cookie_provider(Arc::new(cookies))
                    .build()
                    .context("failed to build API client")?;

                let product = client
                    .get_product_detail(id)
                    .await
                    .with_context(|| format!("failed to fetch product {id}"))?;

                let label = ProductLabel {
                    images: product.images(),
                    calories: product.calorie_info(),
                    nutrition: product.nutrition_values(),
                    categories: product.nutrient_categories(),
                    product: &product,
                };
                println!("{}", serde_json::to_string_pretty(&label)?);

                if client.auth_store().show_login_modal() {
                    info!("Session expired, run `nutrilabel bootstrap` with a fresh login redirect");
                }
            }
            Self::Token { command } => {
                let store = token_store(&config)?;
                match command {
                    TokenCommands::Show => match store.load()? {
                        Some(token) => println!("{token}"),
                        None => bail!("no access token stored"),
                    },
                    TokenCommands::Set { token } => {
                        store.save(&token)?;
                        info!("Access token stored");
                    }
                    TokenCommands::Clear => {
                        store.clear()?;
                        info!("Access token cleared");
                    }
                }
            }
            Self::Bootstrap { url } => {
                let store = token_store(&config)?;
                let location =
                    Location::parse(&url).with_context(|| format!("invalid address: {url}"))?;

                if location.query_param("access_token").is_none() {
                    bail!("address carries no access_token parameter");
                }
                extract_and_store_access_token(&location, store.as_ref())?;
                info!("Access token stored");
                println!("{}", location.href());
            }
            Self::Config => {
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
        }

        Ok(())
    }
}

fn storage_dir(config: &ClientConfig) -> Result<PathBuf> {
    match &config.token_dir {
        Some(dir) => Ok(dir.clone()),
        None => Ok(FileTokenStore::default_dir()?),
    }
}

fn token_store(config: &ClientConfig) -> Result<Arc<dyn TokenStore>> {
    let store = FileTokenStore::new(storage_dir(config)?);
    info!(path = %store.path().display(), "Using token store");
    Ok(Arc::new(store))
}
