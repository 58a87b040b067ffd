//! Field validation for client-supplied documents.
//!
//! Each validator collects every violated rule so the client sees all
//! problems in one response.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::database::models::{
    Bootcamp, BootcampInput, Career, Course, CourseInput, MinimumSkill, Review, ReviewInput,
};
use crate::error::ApiError;

static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(https?://)?([\da-z.-]+)\.([a-z.]{2,6})([/\w .-]*)*/?$").expect("valid url regex")
});

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\w+([.-]?\w+)*@\w+([.-]?\w+)*(\.\w{2,3})+$").expect("valid email regex")
});

pub const NAME_MAX: usize = 50;
pub const DESCRIPTION_MAX: usize = 500;
pub const PHONE_MAX: usize = 20;
pub const REVIEW_TITLE_MAX: usize = 100;
pub const PASSWORD_MIN: usize = 6;

#[derive(Debug, Default)]
pub struct Violations(Vec<String>);

impl Violations {
    pub fn add(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }

    pub fn check(&mut self, ok: bool, message: &str) {
        if !ok {
            self.add(message);
        }
    }

    pub fn into_result(self) -> Result<(), ApiError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation_error(self.0))
        }
    }
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn is_valid_url(url: &str) -> bool {
    URL_RE.is_match(url)
}

/// Lowercase, with runs of non-alphanumerics collapsed to a single `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn parse_careers(raw: &[String], violations: &mut Violations) -> Vec<Career> {
    let mut careers = Vec::new();
    for name in raw {
        match Career::parse(name) {
            Some(c) if !careers.contains(&c) => careers.push(c),
            Some(_) => {}
            None => violations.add(format!("`{}` is not a valid career", name)),
        }
    }
    careers
}

/// Applies `input` over `target` and validates the result.
///
/// On create `target` is a blank document and every required field must be
/// supplied. `address` is only read on create; location is derived from it
/// once and never rewritten.
pub fn apply_bootcamp(target: &mut Bootcamp, input: &BootcampInput, creating: bool) -> Result<(), ApiError> {
    let mut v = Violations::default();

    if let Some(name) = &input.name {
        target.name = name.trim().to_string();
    }
    if let Some(description) = &input.description {
        target.description = description.clone();
    }
    if input.website.is_some() {
        target.website = present(&input.website).map(str::to_string);
    }
    if input.phone.is_some() {
        target.phone = present(&input.phone).map(str::to_string);
    }
    if input.email.is_some() {
        target.email = present(&input.email).map(str::to_string);
    }
    if creating {
        target.address = present(&input.address).unwrap_or_default().to_string();
    }
    if let Some(careers) = &input.careers {
        target.careers = parse_careers(careers, &mut v);
    }
    if let Some(housing) = input.housing {
        target.housing = housing;
    }
    if let Some(job_assistance) = input.job_assistance {
        target.job_assistance = job_assistance;
    }
    if let Some(job_guarantee) = input.job_guarantee {
        target.job_guarantee = job_guarantee;
    }
    if let Some(accept_gi) = input.accept_gi {
        target.accept_gi = accept_gi;
    }

    v.check(!target.name.is_empty(), "Please add a name");
    v.check(target.name.chars().count() <= NAME_MAX, "Name can not be more than 50 characters");
    v.check(!target.description.trim().is_empty(), "Please add a description");
    v.check(
        target.description.chars().count() <= DESCRIPTION_MAX,
        "Description can not be more than 500 characters",
    );
    if let Some(website) = &target.website {
        v.check(is_valid_url(website), "Please use a valid URL with HTTP or HTTPS");
    }
    if let Some(phone) = &target.phone {
        v.check(phone.chars().count() <= PHONE_MAX, "Phone number can not be longer than 20 characters");
    }
    if let Some(email) = &target.email {
        v.check(is_valid_email(email), "Please add a valid email");
    }
    v.check(!target.address.is_empty(), "Please add an address");
    v.check(!target.careers.is_empty(), "Please add at least one career");

    v.into_result()?;
    target.slug = slugify(&target.name);
    Ok(())
}

/// Same contract as [`apply_bootcamp`]: on create every required field must be supplied.
pub fn apply_course(target: &mut Course, input: &CourseInput, creating: bool) -> Result<(), ApiError> {
    let mut v = Violations::default();

    if let Some(title) = &input.title {
        target.title = title.trim().to_string();
    }
    if let Some(description) = &input.description {
        target.description = description.clone();
    }
    if let Some(weeks) = &input.weeks {
        target.weeks = weeks.trim().to_string();
    }
    if let Some(tuition) = input.tuition {
        target.tuition = tuition;
    }
    if let Some(skill) = &input.minimum_skill {
        match MinimumSkill::parse(skill) {
            Some(s) => target.minimum_skill = s,
            None => v.add(format!("`{}` is not a valid minimum skill", skill)),
        }
    }
    if let Some(scholarship) = input.scholarship_available {
        target.scholarship_available = scholarship;
    }

    v.check(!target.title.is_empty(), "Please add a course title");
    v.check(!target.description.trim().is_empty(), "Please add a description");
    v.check(!target.weeks.is_empty(), "Please add number of weeks");
    if creating {
        v.check(input.tuition.is_some(), "Please add a tuition cost");
        v.check(input.minimum_skill.is_some(), "Please add a minimum skill");
    }
    v.check(target.tuition.is_finite() && target.tuition >= 0.0, "Tuition can not be negative");

    v.into_result()
}

pub fn apply_review(target: &mut Review, input: &ReviewInput) -> Result<(), ApiError> {
    let mut v = Violations::default();

    if let Some(title) = &input.title {
        target.title = title.trim().to_string();
    }
    if let Some(text) = &input.text {
        target.text = text.clone();
    }
    if let Some(rating) = input.rating {
        target.rating = rating;
    }

    v.check(!target.title.is_empty(), "Please add a title for the review");
    v.check(
        target.title.chars().count() <= REVIEW_TITLE_MAX,
        "Title can not be more than 100 characters",
    );
    v.check(!target.text.trim().is_empty(), "Please add some text");
    v.check((1..=10).contains(&target.rating), "Please add a rating between 1 and 10");

    v.into_result()
}

pub fn check_password(password: Option<&str>, v: &mut Violations) {
    match password {
        None | Some("") => v.add("Please add a password"),
        Some(p) if p.chars().count() < PASSWORD_MIN => v.add("Password must be at least 6 characters"),
        Some(_) => {}
    }
}

pub fn check_email(email: Option<&str>, v: &mut Violations) {
    match email.map(str::trim) {
        None | Some("") => v.add("Please add an email"),
        Some(e) if !is_valid_email(e) => v.add("Please add a valid email"),
        Some(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_are_lowercase_and_dashed() {
        assert_eq!(slugify("Devworks Bootcamp"), "devworks-bootcamp");
        assert_eq!(slugify("  ModernTech  -- Bootcamp! "), "moderntech-bootcamp");
        assert_eq!(slugify("UI/UX 101"), "ui-ux-101");
    }

    #[test]
    fn url_and_email_patterns() {
        assert!(is_valid_url("https://devworks.com"));
        assert!(is_valid_url("http://www.devworks.co.uk/path/to"));
        assert!(!is_valid_url("ftp://devworks.com"));
        assert!(is_valid_email("enroll@devworks.com"));
        assert!(!is_valid_email("enroll@devworks"));
        assert!(!is_valid_email("not an email"));
    }

    #[test]
    fn violations_collect_every_message() {
        let mut v = Violations::default();
        check_email(None, &mut v);
        check_password(Some("123"), &mut v);
        let err = v.into_result().unwrap_err();
        assert_eq!(err.message(), "Please add an email, Password must be at least 6 characters");
    }
}
