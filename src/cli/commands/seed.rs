use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use chrono::Utc;
use clap::Subcommand;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::hash_password;
use crate::cli::utils::{output_step, output_success};
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::models::{
    Bootcamp, BootcampInput, Course, CourseInput, Location, MinimumSkill, Review, ReviewInput, User, DEFAULT_PHOTO,
};
use crate::geo::Geocoder;
use crate::server;
use crate::services::aggregate;
use crate::store::Store;
use crate::types::Role;
use crate::validation::{apply_bootcamp, apply_course, apply_review};

#[derive(Subcommand)]
pub enum SeedCommands {
    #[command(about = "Import users, bootcamps, courses and reviews from JSON files")]
    Import {
        #[arg(long, help = "Directory holding users.json, bootcamps.json, courses.json, reviews.json", default_value = "_data")]
        dir: PathBuf,
    },

    #[command(about = "Delete every record from the store")]
    Destroy,
}

pub async fn handle(cmd: SeedCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    let store = server::postgres_store(&config).await?;

    match cmd {
        SeedCommands::Import { dir } => {
            let geocoder = crate::geo::from_config(&config.geocoder)?;
            let report = import_dir(store.as_ref(), geocoder.as_ref(), &dir, config.auth.bcrypt_cost, &output_format).await?;
            output_success(
                &output_format,
                "All data imported",
                Some(json!({
                    "users": report.users,
                    "bootcamps": report.bootcamps,
                    "courses": report.courses,
                    "reviews": report.reviews,
                })),
            )
        }
        SeedCommands::Destroy => {
            store.clear_all().await?;
            tracing::info!("Seed data destroyed");
            output_success(&output_format, "All data destroyed", None)
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub users: usize,
    pub bootcamps: usize,
    pub courses: usize,
    pub reviews: usize,
}

#[derive(Debug, Deserialize)]
struct SeedUser {
    #[serde(rename = "_id", alias = "id")]
    id: String,
    name: String,
    email: String,
    #[serde(default)]
    role: Option<String>,
    password: String,
}

#[derive(Debug, Deserialize)]
struct SeedBootcamp {
    #[serde(rename = "_id", alias = "id")]
    id: String,
    user: String,
    #[serde(default)]
    location: Option<Location>,
    #[serde(flatten)]
    input: BootcampInput,
}

#[derive(Debug, Deserialize)]
struct SeedCourse {
    #[serde(rename = "_id", alias = "id")]
    id: String,
    bootcamp: String,
    user: String,
    #[serde(flatten)]
    input: CourseInput,
}

#[derive(Debug, Deserialize)]
struct SeedReview {
    #[serde(rename = "_id", alias = "id")]
    id: String,
    bootcamp: String,
    user: String,
    #[serde(flatten)]
    input: ReviewInput,
}

/// Seed files carry foreign ids; UUID-shaped ones are kept, others get a fresh id per distinct value.
#[derive(Default)]
struct IdMap(HashMap<String, Uuid>);

impl IdMap {
    fn resolve(&mut self, raw: &str) -> Uuid {
        *self
            .0
            .entry(raw.to_string())
            .or_insert_with(|| Uuid::parse_str(raw).unwrap_or_else(|_| Uuid::new_v4()))
    }
}

fn read_seed<T: DeserializeOwned>(dir: &Path, file: &str) -> anyhow::Result<Vec<T>> {
    let path = dir.join(file);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

/// Loads every seed file in `dir` through the store, then recomputes bootcamp averages.
pub async fn import_dir(
    store: &dyn Store,
    geocoder: &dyn Geocoder,
    dir: &Path,
    bcrypt_cost: u32,
    output_format: &OutputFormat,
) -> anyhow::Result<SeedReport> {
    let users: Vec<SeedUser> = read_seed(dir, "users.json")?;
    let bootcamps: Vec<SeedBootcamp> = read_seed(dir, "bootcamps.json")?;
    let courses: Vec<SeedCourse> = read_seed(dir, "courses.json")?;
    let reviews: Vec<SeedReview> = read_seed(dir, "reviews.json")?;

    let mut ids = IdMap::default();
    let mut roles: HashMap<Uuid, Role> = HashMap::new();
    let mut report = SeedReport::default();

    for seed in users {
        let role = match seed.role.as_deref() {
            None => Role::User,
            Some(raw) => Role::parse(raw).ok_or_else(|| anyhow!("invalid role `{}` for {}", raw, seed.email))?,
        };
        let user = User {
            id: ids.resolve(&seed.id),
            name: seed.name,
            email: seed.email,
            role,
            password_hash: hash_password(&seed.password, bcrypt_cost).await?,
            reset_password_token: None,
            reset_password_expire: None,
            created_at: Utc::now(),
        };
        store.insert_user(&user).await.with_context(|| format!("user {}", user.email))?;
        roles.insert(user.id, role);
        report.users += 1;
    }
    output_step(output_format, &format!("Users imported: {}", report.users));

    let mut bootcamp_ids = Vec::new();
    for seed in bootcamps {
        let owner = ids.resolve(&seed.user);
        let mut bootcamp = Bootcamp {
            id: ids.resolve(&seed.id),
            name: String::new(),
            slug: String::new(),
            description: String::new(),
            website: None,
            phone: None,
            email: None,
            address: String::new(),
            location: Location::point(0.0, 0.0),
            careers: Vec::new(),
            average_rating: None,
            average_cost: None,
            photo: DEFAULT_PHOTO.to_string(),
            housing: false,
            job_assistance: false,
            job_guarantee: false,
            accept_gi: false,
            user: owner,
            created_at: Utc::now(),
            admin_owned: roles.get(&owner) == Some(&Role::Admin),
        };
        apply_bootcamp(&mut bootcamp, &seed.input, true).with_context(|| format!("bootcamp {}", seed.id))?;
        bootcamp.location = match seed.location {
            Some(location) => location,
            None => Location::from(geocoder.geocode(&bootcamp.address).await?),
        };
        store.insert_bootcamp(&bootcamp).await.with_context(|| format!("bootcamp {}", bootcamp.name))?;
        bootcamp_ids.push(bootcamp.id);
        report.bootcamps += 1;
    }
    output_step(output_format, &format!("Bootcamps imported: {}", report.bootcamps));

    for seed in courses {
        let mut course = Course {
            id: ids.resolve(&seed.id),
            title: String::new(),
            description: String::new(),
            weeks: String::new(),
            tuition: 0.0,
            minimum_skill: MinimumSkill::Beginner,
            scholarship_available: false,
            bootcamp: ids.resolve(&seed.bootcamp),
            user: ids.resolve(&seed.user),
            created_at: Utc::now(),
        };
        apply_course(&mut course, &seed.input, true).with_context(|| format!("course {}", seed.id))?;
        store.insert_course(&course).await.with_context(|| format!("course {}", course.title))?;
        report.courses += 1;
    }
    output_step(output_format, &format!("Courses imported: {}", report.courses));

    for seed in reviews {
        let mut review = Review {
            id: ids.resolve(&seed.id),
            title: String::new(),
            text: String::new(),
            rating: 0,
            bootcamp: ids.resolve(&seed.bootcamp),
            user: ids.resolve(&seed.user),
            created_at: Utc::now(),
        };
        apply_review(&mut review, &seed.input).with_context(|| format!("review {}", seed.id))?;
        store.insert_review(&review).await.with_context(|| format!("review {}", review.title))?;
        report.reviews += 1;
    }
    output_step(output_format, &format!("Reviews imported: {}", report.reviews));

    for id in bootcamp_ids {
        aggregate::recompute_average_cost(store, id).await?;
        aggregate::recompute_average_rating(store, id).await?;
    }

    tracing::info!(
        "Seeded {} users, {} bootcamps, {} courses, {} reviews",
        report.users,
        report.bootcamps,
        report.courses,
        report.reviews
    );
    Ok(report)
}
