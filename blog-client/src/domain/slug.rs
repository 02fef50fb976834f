//! Post slugs: validation, derivation from titles, and the editor latch.
//!
//! Slugs are trimmed, non-empty identifiers composed of lowercase ASCII
//! letters, digits, and hyphens. Derived slugs transliterate Han
//! characters to toneless pinyin and end with a `YYYYMMDD` date suffix so
//! one author publishing the same title on different days does not
//! collide.

use std::fmt;

use chrono::NaiveDate;
use mockable::Clock;
use pinyin::ToPinyin;
use serde::{Deserialize, Serialize};

/// Return `true` when `value` is a valid slug.
pub(crate) fn is_valid_slug(value: &str) -> bool {
    is_trimmed_non_empty(value) && has_allowed_slug_chars(value)
}

fn is_trimmed_non_empty(value: &str) -> bool {
    !value.is_empty() && value.trim() == value
}

fn has_allowed_slug_chars(value: &str) -> bool {
    value
        .chars()
        .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-')
}

/// Validation errors returned by [`Slug::new`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlugValidationError {
    /// Slug was blank.
    #[error("slug must not be empty")]
    Empty,
    /// Slug contained characters outside `[a-z0-9-]` or surrounding spaces.
    #[error("slug may only contain lowercase letters, digits, and hyphens")]
    InvalidCharacters,
}

/// URL-safe, globally unique post identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl Slug {
    /// Validate and construct a [`Slug`].
    pub fn new(value: impl Into<String>) -> Result<Self, SlugValidationError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(SlugValidationError::Empty);
        }
        if !is_valid_slug(&value) {
            return Err(SlugValidationError::InvalidCharacters);
        }
        Ok(Self(value))
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<Slug> for String {
    fn from(value: Slug) -> Self {
        value.0
    }
}

impl TryFrom<String> for Slug {
    type Error = SlugValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Transliterate and normalise a title into slug form, without a suffix.
///
/// Han characters become space-separated pinyin syllables; everything is
/// lowercased; characters outside `[a-z0-9 -]` are dropped; whitespace
/// runs become single hyphens and repeated hyphens collapse.
///
/// # Examples
/// ```
/// use blog_client::domain::slug_base;
///
/// assert_eq!(slug_base("Hello, World!"), "hello-world");
/// assert_eq!(slug_base("中国"), "zhong-guo");
/// ```
#[must_use]
pub fn slug_base(title: &str) -> String {
    let mut transliterated = String::with_capacity(title.len());
    for ch in title.chars() {
        match ch.to_pinyin() {
            Some(syllable) => {
                transliterated.push(' ');
                transliterated.push_str(syllable.plain());
                transliterated.push(' ');
            }
            None => transliterated.push(ch),
        }
    }

    let kept: String = transliterated
        .to_lowercase()
        .chars()
        .filter(|ch| {
            ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch.is_whitespace() || *ch == '-'
        })
        .collect();

    let mut slug = String::with_capacity(kept.len());
    for ch in kept.trim().chars() {
        let ch = if ch.is_whitespace() { '-' } else { ch };
        if ch == '-' && slug.ends_with('-') {
            continue;
        }
        slug.push(ch);
    }
    slug
}

/// Derive a slug from a title and the date it is written on.
///
/// Titles with nothing transliterable yield the bare date.
///
/// # Examples
/// ```
/// use blog_client::domain::derive_slug;
/// use chrono::NaiveDate;
///
/// let date = NaiveDate::from_ymd_opt(2026, 10, 18).expect("valid date");
/// assert_eq!(derive_slug("Hello World", date), "hello-world-20261018");
/// ```
#[must_use]
pub fn derive_slug(title: &str, date: NaiveDate) -> String {
    let suffix = date.format("%Y%m%d").to_string();
    let base = slug_base(title);
    if base.is_empty() {
        suffix
    } else if base.ends_with('-') {
        format!("{base}{suffix}")
    } else {
        format!("{base}-{suffix}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlugMode {
    /// New post; follows the title until edited by hand.
    Derived,
    /// Edited by hand; never derived again.
    Manual,
    /// Existing post; refilled from the title only once cleared.
    Existing,
}

/// Slug input state for a post editor.
///
/// A new post's slug tracks the title on every keystroke until the user
/// edits the slug field; from then on derivation stops for good.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlugField {
    value: String,
    mode: SlugMode,
}

impl Default for SlugField {
    fn default() -> Self {
        Self::new()
    }
}

impl SlugField {
    /// Empty field for a new post.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            value: String::new(),
            mode: SlugMode::Derived,
        }
    }

    /// Field pre-filled with the slug of a post being edited.
    #[must_use]
    pub fn for_existing(slug: &Slug) -> Self {
        Self {
            value: slug.to_string(),
            mode: SlugMode::Existing,
        }
    }

    /// React to a title change.
    pub fn title_changed(&mut self, title: &str, clock: &dyn Clock) {
        match self.mode {
            SlugMode::Derived => {
                self.value = derive_slug(title, clock.local().date_naive());
            }
            SlugMode::Existing if self.value.is_empty() => {
                self.value = slug_base(title);
            }
            SlugMode::Existing | SlugMode::Manual => {}
        }
    }

    /// Record a manual edit of the slug field.
    pub fn edit(&mut self, value: impl Into<String>) {
        self.value = value.into();
        if self.mode == SlugMode::Derived {
            self.mode = SlugMode::Manual;
        }
    }

    /// Current field content.
    #[must_use]
    pub fn value(&self) -> &str {
        self.value.as_str()
    }

    /// Whether the user has taken over the slug on a new post.
    #[must_use]
    pub fn is_manual(&self) -> bool {
        self.mode == SlugMode::Manual
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use chrono::{DateTime, Local, TimeZone, Utc};
    use rstest::{fixture, rstest};

    struct FixtureClock(DateTime<Utc>);

    impl Clock for FixtureClock {
        fn local(&self) -> DateTime<Local> {
            self.0.with_timezone(&Local)
        }

        fn utc(&self) -> DateTime<Utc> {
            self.0
        }
    }

    #[fixture]
    fn clock() -> FixtureClock {
        // Midday UTC keeps the local date stable across test host time zones.
        FixtureClock(
            Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0)
                .single()
                .expect("valid fixture timestamp"),
        )
    }

    fn today(clock: &FixtureClock) -> String {
        clock.local().date_naive().format("%Y%m%d").to_string()
    }

    #[rstest]
    #[case("hello-world")]
    #[case("post-42")]
    #[case("20261018")]
    fn accepts_valid_slugs(#[case] raw: &str) {
        assert!(Slug::new(raw).is_ok());
    }

    #[rstest]
    #[case("", SlugValidationError::Empty)]
    #[case("   ", SlugValidationError::Empty)]
    #[case("Hello", SlugValidationError::InvalidCharacters)]
    #[case("with space", SlugValidationError::InvalidCharacters)]
    #[case(" padded", SlugValidationError::InvalidCharacters)]
    fn rejects_invalid_slugs(#[case] raw: &str, #[case] expected: SlugValidationError) {
        assert_eq!(Slug::new(raw).expect_err("invalid slug"), expected);
    }

    #[rstest]
    #[case("Hello   World", "hello-world")]
    #[case("  Rust -- tips & tricks  ", "rust-tips-tricks")]
    #[case("中国", "zhong-guo")]
    #[case("Hello 中国", "hello-zhong-guo")]
    #[case("!!!", "")]
    fn slug_base_normalises_titles(#[case] title: &str, #[case] expected: &str) {
        assert_eq!(slug_base(title), expected);
    }

    #[rstest]
    fn han_titles_derive_deterministic_dated_slugs(clock: FixtureClock) {
        let date = clock.local().date_naive();
        let first = derive_slug("我的第一篇", date);
        let second = derive_slug("我的第一篇", date);

        assert_eq!(first, second);
        assert!(first.starts_with("wo-"), "unexpected slug {first}");
        assert!(first.ends_with(&format!("-{}", today(&clock))));
        assert!(is_valid_slug(&first));
    }

    #[rstest]
    fn untransliterable_titles_fall_back_to_the_date(clock: FixtureClock) {
        assert_eq!(derive_slug("???", clock.local().date_naive()), today(&clock));
    }

    #[rstest]
    fn new_field_follows_the_title(clock: FixtureClock) {
        let mut field = SlugField::new();
        field.title_changed("First", &clock);
        field.title_changed("First draft", &clock);
        assert_eq!(field.value(), format!("first-draft-{}", today(&clock)));
        assert!(!field.is_manual());
    }

    #[rstest]
    fn manual_edit_latches_permanently(clock: FixtureClock) {
        let mut field = SlugField::new();
        field.title_changed("我的第一篇", &clock);
        field.edit("custom-slug");
        field.title_changed("A different title", &clock);
        field.edit("custom-slug");
        field.title_changed("Yet another", &clock);

        assert_eq!(field.value(), "custom-slug");
        assert!(field.is_manual());
    }

    #[rstest]
    fn manual_edit_to_blank_still_latches(clock: FixtureClock) {
        let mut field = SlugField::new();
        field.edit("");
        field.title_changed("Title", &clock);
        assert_eq!(field.value(), "");
    }

    #[rstest]
    fn existing_field_refills_only_when_cleared(clock: FixtureClock) {
        let slug = Slug::new("kept-slug").expect("valid slug");
        let mut field = SlugField::for_existing(&slug);
        field.title_changed("New title", &clock);
        assert_eq!(field.value(), "kept-slug");

        field.edit("");
        field.title_changed("New title", &clock);
        assert_eq!(field.value(), "new-title");
    }
}
