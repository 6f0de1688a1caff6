use super::{Cell, WorkTable};

/// Training-set median, fixed at design time. Recomputing it per call would
/// break train/inference parity.
pub const AGE_DEFAULT: f64 = 31.0;

/// Plausible respondent age range, inclusive on both ends.
pub const AGE_MIN: f64 = 18.0;
pub const AGE_MAX: f64 = 75.0;

/// Known free-text spellings for the two normalized genders. Matching is
/// case-sensitive and literal; anything outside both lists is "Other".
static MALE_TERMS: &[&str] = &[
    "Male", "male", "M", "m", "Make", "Cis Male", "Man", "msle", "Mail", "Mal", "Cis Man",
    "Male-ish", "maile", "Malr",
];
static FEMALE_TERMS: &[&str] = &[
    "Female",
    "female",
    "F",
    "f",
    "Woman",
    "Cis Female",
    "Femake",
    "woman",
    "Female ",
    "cis-female/femme",
    "femail",
];

/// Coerce `Age` to a number, replacing anything unparsable or outside
/// [18, 75] with the fixed median.
pub fn clean_age(table: &mut WorkTable) {
    table.map_column("Age", |cell| {
        let parsed = match cell {
            Cell::Num(v) => Some(*v),
            Cell::Text(s) => s.trim().parse::<f64>().ok(),
            Cell::Missing => None,
        };
        let age = match parsed {
            Some(v) if (AGE_MIN..=AGE_MAX).contains(&v) => v,
            _ => AGE_DEFAULT,
        };
        Cell::Num(age)
    });
}

/// Collapse free-text gender into exactly one of Male / Female / Other.
pub fn normalize_gender(table: &mut WorkTable) {
    table.map_column("Gender", |cell| {
        let label = match cell {
            Cell::Text(s) if MALE_TERMS.contains(&s.as_str()) => "Male",
            Cell::Text(s) if FEMALE_TERMS.contains(&s.as_str()) => "Female",
            _ => "Other",
        };
        Cell::Text(label.to_string())
    });
}

/// Fill the two fields with known training-set modes; fixed defaults, same as
/// the age median.
pub fn impute_defaults(table: &mut WorkTable) {
    for (column, default) in [("self_employed", "No"), ("work_interfere", "Sometimes")] {
        table.map_column(column, |cell| match cell {
            Cell::Missing => Cell::Text(default.to_string()),
            other => other.clone(),
        });
    }
}

/// Drop the fields the model never sees. `treatment` is the target and is
/// extracted by ingestion; it must never leak into the feature columns.
pub fn prune(table: &mut WorkTable) {
    for column in ["Timestamp", "comments", "state", "treatment"] {
        table.drop_column(column);
    }
}
