use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const DEFAULT_PHOTO: &str = "no-photo.jpg";

/// Career tracks a bootcamp can advertise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Career {
    #[serde(rename = "Web Development")]
    WebDevelopment,
    #[serde(rename = "Mobile Development")]
    MobileDevelopment,
    #[serde(rename = "UI/UX")]
    UiUx,
    #[serde(rename = "Data Science")]
    DataScience,
    Business,
    Other,
}

impl Career {
    pub const ALL: [Career; 6] = [
        Career::WebDevelopment,
        Career::MobileDevelopment,
        Career::UiUx,
        Career::DataScience,
        Career::Business,
        Career::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Career::WebDevelopment => "Web Development",
            Career::MobileDevelopment => "Mobile Development",
            Career::UiUx => "UI/UX",
            Career::DataScience => "Data Science",
            Career::Business => "Business",
            Career::Other => "Other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }
}

/// GeoJSON point plus the decomposed postal fields of the geocoded address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(rename = "type")]
    pub kind: String,
    /// `[longitude, latitude]`
    pub coordinates: [f64; 2],
    #[serde(default)]
    pub formatted_address: Option<String>,
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zipcode: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl Location {
    pub fn point(longitude: f64, latitude: f64) -> Self {
        Self {
            kind: "Point".to_string(),
            coordinates: [longitude, latitude],
            formatted_address: None,
            street: None,
            city: None,
            state: None,
            zipcode: None,
            country: None,
        }
    }

    pub fn longitude(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn latitude(&self) -> f64 {
        self.coordinates[1]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bootcamp {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: String,
    pub location: Location,
    pub careers: Vec<Career>,
    pub average_rating: Option<f64>,
    pub average_cost: Option<i32>,
    pub photo: String,
    pub housing: bool,
    pub job_assistance: bool,
    pub job_guarantee: bool,
    pub accept_gi: bool,
    pub user: Uuid,
    pub created_at: DateTime<Utc>,
    /// Bootcamps created by an admin do not count towards the one-per-publisher limit.
    #[serde(skip)]
    pub admin_owned: bool,
}

/// Flat row shape of the `bootcamps` table.
#[derive(Debug, Clone, FromRow)]
pub struct BootcampRow {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: String,
    pub longitude: f64,
    pub latitude: f64,
    pub formatted_address: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zipcode: Option<String>,
    pub country: Option<String>,
    pub careers: Vec<String>,
    pub average_rating: Option<f64>,
    pub average_cost: Option<i32>,
    pub photo: String,
    pub housing: bool,
    pub job_assistance: bool,
    pub job_guarantee: bool,
    pub accept_gi: bool,
    pub user_id: Uuid,
    pub admin_owned: bool,
    pub created_at: DateTime<Utc>,
}

impl From<BootcampRow> for Bootcamp {
    fn from(row: BootcampRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
            description: row.description,
            website: row.website,
            phone: row.phone,
            email: row.email,
            address: row.address,
            location: Location {
                kind: "Point".to_string(),
                coordinates: [row.longitude, row.latitude],
                formatted_address: row.formatted_address,
                street: row.street,
                city: row.city,
                state: row.state,
                zipcode: row.zipcode,
                country: row.country,
            },
            careers: row.careers.iter().filter_map(|c| Career::parse(c)).collect(),
            average_rating: row.average_rating,
            average_cost: row.average_cost,
            photo: row.photo,
            housing: row.housing,
            job_assistance: row.job_assistance,
            job_guarantee: row.job_guarantee,
            accept_gi: row.accept_gi,
            user: row.user_id,
            created_at: row.created_at,
            admin_owned: row.admin_owned,
        }
    }
}

/// Client-writable bootcamp fields. Unknown and derived fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootcampInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub careers: Option<Vec<String>>,
    pub housing: Option<bool>,
    pub job_assistance: Option<bool>,
    pub job_guarantee: Option<bool>,
    pub accept_gi: Option<bool>,
}

/// `{id, name, description}` attached to course and review listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootcampSummary {
    pub id: Uuid,
    pub name: String,
    pub description: String,
}

impl From<&Bootcamp> for BootcampSummary {
    fn from(b: &Bootcamp) -> Self {
        Self { id: b.id, name: b.name.clone(), description: b.description.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn careers_use_display_names_on_the_wire() {
        let v = serde_json::to_value(vec![Career::UiUx, Career::WebDevelopment]).unwrap();
        assert_eq!(v, json!(["UI/UX", "Web Development"]));
        assert_eq!(Career::parse("Data Science"), Some(Career::DataScience));
        assert_eq!(Career::parse("Cooking"), None);
    }

    #[test]
    fn location_serializes_as_geojson_point() {
        let v = serde_json::to_value(Location::point(-71.1, 42.3)).unwrap();
        assert_eq!(v["type"], "Point");
        assert_eq!(v["coordinates"], json!([-71.1, 42.3]));
        assert!(v.get("formattedAddress").is_some());
    }
}
