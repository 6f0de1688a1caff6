use super::{Cell, NominalCodes, WorkTable};
use anyhow::Result;
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Code emitted for any value an encoding table does not know, including a
/// missing cell with no imputation rule. It participates in the engineered
/// sums like any other code, so an out-of-vocabulary answer lowers a score
/// predictably instead of poisoning it.
pub const UNKNOWN_CODE: f64 = -1.0;

static BINARY_MAP: Lazy<HashMap<&'static str, f64>> =
    Lazy::new(|| HashMap::from([("Yes", 1.0), ("No", 0.0), ("Don't know", 0.0)]));

static LEAVE_MAP: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    HashMap::from([
        ("Very easy", 4.0),
        ("Somewhat easy", 3.0),
        ("Don't know", 2.0),
        ("Somewhat difficult", 1.0),
        ("Very difficult", 0.0),
    ])
});

static STIGMA_MAP: Lazy<HashMap<&'static str, f64>> =
    Lazy::new(|| HashMap::from([("Yes", 2.0), ("Maybe", 1.0), ("No", 0.0)]));

static INTERFERE_MAP: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    HashMap::from([
        ("Often", 3.0),
        ("Sometimes", 2.0),
        ("Rarely", 1.0),
        ("Never", 0.0),
    ])
});

static EMPLOYEE_MAP: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    HashMap::from([
        ("1-5", 0.0),
        ("6-25", 1.0),
        ("26-100", 2.0),
        ("100-500", 3.0),
        ("500-1000", 4.0),
        ("More than 1000", 5.0),
    ])
});

const BINARY_COLUMNS: &[&str] = &["benefits", "wellness_program", "seek_help", "anonymity"];
const STIGMA_COLUMNS: &[&str] = &["mental_health_consequence", "phys_health_consequence"];

const SUPPORT_COLUMNS: &[&str] = &[
    "benefits",
    "wellness_program",
    "seek_help",
    "anonymity",
    "leave",
];

/// The nominal text fields that get small integer codes rather than one-hot
/// columns.
pub const NOMINAL_FIELDS: &[&str] = &[
    "self_employed",
    "family_history",
    "remote_work",
    "tech_company",
    "care_options",
    "coworkers",
    "supervisor",
    "mental_health_interview",
    "phys_health_interview",
    "mental_vs_physical",
    "obs_consequence",
];

fn encode_with(table: &mut WorkTable, column: &str, map: &HashMap<&'static str, f64>) {
    table.map_column(column, |cell| {
        let code = match cell {
            Cell::Text(s) => map.get(s.as_str()).copied().unwrap_or(UNKNOWN_CODE),
            Cell::Num(v) => *v,
            Cell::Missing => UNKNOWN_CODE,
        };
        Cell::Num(code)
    });
}

/// Apply the fixed ordinal and binary tables.
pub fn encode_ordinals(table: &mut WorkTable) {
    for column in BINARY_COLUMNS {
        encode_with(table, column, &BINARY_MAP);
    }
    encode_with(table, "leave", &LEAVE_MAP);
    for column in STIGMA_COLUMNS {
        encode_with(table, column, &STIGMA_MAP);
    }
    encode_with(table, "work_interfere", &INTERFERE_MAP);
    encode_with(table, "no_employees", &EMPLOYEE_MAP);
}

fn sum_columns(table: &WorkTable, columns: &[&str]) -> Result<Vec<f64>> {
    let mut sums = vec![0.0; table.num_rows()];
    for column in columns {
        for (sum, value) in sums.iter_mut().zip(table.numeric_column(column)?) {
            *sum += value;
        }
    }
    Ok(sums)
}

/// Append `support_score` and `stigma_score`, the sums of their encoded
/// component columns. Unknown codes participate as-is.
pub fn add_engineered_scores(table: &mut WorkTable) -> Result<()> {
    let support = sum_columns(table, SUPPORT_COLUMNS)?;
    table.push_column("support_score", support.into_iter().map(Cell::Num).collect())?;
    let stigma = sum_columns(table, STIGMA_COLUMNS)?;
    table.push_column("stigma_score", stigma.into_iter().map(Cell::Num).collect())?;
    Ok(())
}

/// Bucket a cleaned age. Boundaries are left-inclusive: exactly 30 is
/// "31-40" and exactly 50 is "51-75". Ages arrive clamped to [18, 75], so
/// every row lands in a bucket.
pub fn age_bucket(age: f64) -> &'static str {
    if age < 30.0 {
        "18-30"
    } else if age < 40.0 {
        "31-40"
    } else if age < 50.0 {
        "41-50"
    } else {
        "51-75"
    }
}

/// Replace the raw `Age` column with its bucket label. The model only ever
/// consumes the bucket.
pub fn add_age_group(table: &mut WorkTable) -> Result<()> {
    let ages = table.numeric_column("Age")?;
    let buckets = ages
        .into_iter()
        .map(|age| Cell::Text(age_bucket(age).to_string()))
        .collect();
    table.push_column("age_group", buckets)?;
    table.drop_column("Age");
    Ok(())
}

/// Derive the fixed nominal code table from the sorted distinct values of the
/// training data. Sorting makes the codes deterministic, so retraining on the
/// same dataset reproduces the same table.
pub fn fit_nominal_codes(table: &WorkTable) -> NominalCodes {
    let mut codes = NominalCodes::new();
    for field in NOMINAL_FIELDS {
        let values: BTreeMap<String, f64> = table
            .distinct_text(field)
            .into_iter()
            .enumerate()
            .map(|(code, value)| (value, code as f64))
            .collect();
        codes.insert(field.to_string(), values);
    }
    debug!(fields = codes.len(), "fitted nominal code table");
    codes
}

/// Encode the nominal fields with a fitted table. Values the table never saw
/// (and missing cells) get the unknown code.
pub fn apply_nominal_codes(table: &mut WorkTable, codes: &NominalCodes) {
    for field in NOMINAL_FIELDS {
        let Some(field_codes) = codes.get(*field) else {
            continue;
        };
        table.map_column(field, |cell| {
            let code = match cell {
                Cell::Text(s) => field_codes.get(s).copied().unwrap_or(UNKNOWN_CODE),
                Cell::Num(v) => *v,
                Cell::Missing => UNKNOWN_CODE,
            };
            Cell::Num(code)
        });
    }
}
