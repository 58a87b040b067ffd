//! Queryable field catalogue for each listable collection.
//!
//! Only fields named here can be filtered or sorted on. `name` is the API
//! path (camelCase, dotted for nested location fields), `column` is the
//! PostgreSQL column backing it.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Integer,
    Bool,
    Timestamp,
    Id,
    /// Array of strings; equality means "contains", `in` means "overlaps".
    TextList,
}

#[derive(Debug, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub column: &'static str,
    pub kind: FieldKind,
}

const fn field(name: &'static str, column: &'static str, kind: FieldKind) -> FieldDef {
    FieldDef { name, column, kind }
}

#[derive(Debug)]
pub struct ResourceSchema {
    pub table: &'static str,
    pub fields: &'static [FieldDef],
    pub default_limit: u32,
}

impl ResourceSchema {
    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn id_field(&self) -> &'static FieldDef {
        &self.fields[0]
    }

    pub fn created_at_field(&self) -> &'static FieldDef {
        self.fields
            .iter()
            .find(|f| f.name == "createdAt")
            .unwrap_or(&self.fields[0])
    }
}

/// Collections exposed through the generic listing pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Bootcamps,
    Courses,
    Reviews,
}

impl Collection {
    pub fn schema(self) -> &'static ResourceSchema {
        match self {
            Collection::Bootcamps => &BOOTCAMPS,
            Collection::Courses => &COURSES,
            Collection::Reviews => &REVIEWS,
        }
    }
}

// `id` must stay first in every field list.
pub static BOOTCAMPS: ResourceSchema = ResourceSchema {
    table: "bootcamps",
    default_limit: 25,
    fields: &[
        field("id", "id", FieldKind::Id),
        field("name", "name", FieldKind::Text),
        field("slug", "slug", FieldKind::Text),
        field("description", "description", FieldKind::Text),
        field("website", "website", FieldKind::Text),
        field("phone", "phone", FieldKind::Text),
        field("email", "email", FieldKind::Text),
        field("address", "address", FieldKind::Text),
        field("location.formattedAddress", "formatted_address", FieldKind::Text),
        field("location.street", "street", FieldKind::Text),
        field("location.city", "city", FieldKind::Text),
        field("location.state", "state", FieldKind::Text),
        field("location.zipcode", "zipcode", FieldKind::Text),
        field("location.country", "country", FieldKind::Text),
        field("careers", "careers", FieldKind::TextList),
        field("averageRating", "average_rating", FieldKind::Number),
        field("averageCost", "average_cost", FieldKind::Integer),
        field("photo", "photo", FieldKind::Text),
        field("housing", "housing", FieldKind::Bool),
        field("jobAssistance", "job_assistance", FieldKind::Bool),
        field("jobGuarantee", "job_guarantee", FieldKind::Bool),
        field("acceptGi", "accept_gi", FieldKind::Bool),
        field("user", "user_id", FieldKind::Id),
        field("createdAt", "created_at", FieldKind::Timestamp),
    ],
};

pub static COURSES: ResourceSchema = ResourceSchema {
    table: "courses",
    default_limit: 10,
    fields: &[
        field("id", "id", FieldKind::Id),
        field("title", "title", FieldKind::Text),
        field("description", "description", FieldKind::Text),
        field("weeks", "weeks", FieldKind::Text),
        field("tuition", "tuition", FieldKind::Number),
        field("minimumSkill", "minimum_skill", FieldKind::Text),
        field("scholarshipAvailable", "scholarship_available", FieldKind::Bool),
        field("bootcamp", "bootcamp_id", FieldKind::Id),
        field("user", "user_id", FieldKind::Id),
        field("createdAt", "created_at", FieldKind::Timestamp),
    ],
};

pub static REVIEWS: ResourceSchema = ResourceSchema {
    table: "reviews",
    default_limit: 10,
    fields: &[
        field("id", "id", FieldKind::Id),
        field("title", "title", FieldKind::Text),
        field("text", "text", FieldKind::Text),
        field("rating", "rating", FieldKind::Integer),
        field("bootcamp", "bootcamp_id", FieldKind::Id),
        field("user", "user_id", FieldKind::Id),
        field("createdAt", "created_at", FieldKind::Timestamp),
    ],
};
