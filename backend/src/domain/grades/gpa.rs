//! GPA aggregation over canonical grades.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{GradeEvent, LetterGrade};

/// Errors raised while loading a custom grade scale.
#[derive(Debug, thiserror::Error)]
pub enum GradeScaleError {
    #[error("failed to read grade scale {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("grade scale is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("grade scale has unknown letter {0}")]
    UnknownLetter(String),
    #[error("grade scale is missing letter {0}")]
    MissingLetter(LetterGrade),
    #[error("grade points for {letter} must be finite and between 0 and 5, got {points}")]
    OutOfRange { letter: LetterGrade, points: f64 },
}

/// Mapping from letter grade to grade points.
///
/// The default is the 4.0 scale with 0.3 plus/minus offsets; `A+` is capped
/// at 4.0.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeScale {
    points: [f64; 13],
}

fn slot(grade: LetterGrade) -> usize {
    grade as usize
}

impl Default for GradeScale {
    fn default() -> Self {
        Self::standard()
    }
}

impl GradeScale {
    /// The standard 4.0 scale.
    pub fn standard() -> Self {
        let mut points = [0.0; 13];
        for (grade, value) in [
            (LetterGrade::APlus, 4.0),
            (LetterGrade::A, 4.0),
            (LetterGrade::AMinus, 3.7),
            (LetterGrade::BPlus, 3.3),
            (LetterGrade::B, 3.0),
            (LetterGrade::BMinus, 2.7),
            (LetterGrade::CPlus, 2.3),
            (LetterGrade::C, 2.0),
            (LetterGrade::CMinus, 1.7),
            (LetterGrade::DPlus, 1.3),
            (LetterGrade::D, 1.0),
            (LetterGrade::DMinus, 0.7),
            (LetterGrade::F, 0.0),
        ] {
            points[slot(grade)] = value;
        }
        Self { points }
    }

    /// Grade points for `grade`.
    pub fn points(&self, grade: LetterGrade) -> f64 {
        self.points[slot(grade)]
    }

    /// Parse a JSON object such as `{"A": 4.0, "A-": 3.7, ...}`. Every letter
    /// must be present.
    ///
    /// # Examples
    /// ```
    /// use registrar::domain::grades::GradeScale;
    ///
    /// let err = GradeScale::from_json(r#"{"A": 4.0}"#);
    /// assert!(err.is_err());
    /// ```
    pub fn from_json(json: &str) -> Result<Self, GradeScaleError> {
        let raw: HashMap<String, f64> = serde_json::from_str(json)?;
        let mut parsed: HashMap<LetterGrade, f64> = HashMap::with_capacity(raw.len());
        for (letter, points) in raw {
            let grade: LetterGrade = letter
                .parse()
                .map_err(|_| GradeScaleError::UnknownLetter(letter.clone()))?;
            if !points.is_finite() || !(0.0..=5.0).contains(&points) {
                return Err(GradeScaleError::OutOfRange {
                    letter: grade,
                    points,
                });
            }
            parsed.insert(grade, points);
        }
        let mut points = [0.0; 13];
        for grade in LetterGrade::ALL {
            points[slot(grade)] = *parsed
                .get(&grade)
                .ok_or(GradeScaleError::MissingLetter(grade))?;
        }
        Ok(Self { points })
    }

    /// Read and parse a scale file.
    pub fn load(path: &Path) -> Result<Self, GradeScaleError> {
        let json = std::fs::read_to_string(path).map_err(|source| GradeScaleError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }
}

/// Compute the credit-weighted GPA.
///
/// Only courses present in both `canonical` and `credits` contribute. Returns
/// `None` when no such course exists, so "no GPA yet" is distinct from 0.0.
/// No rounding is applied.
///
/// # Examples
/// ```
/// use std::collections::{BTreeMap, HashMap};
/// use registrar::domain::grades::{GradeScale, compute_gpa};
///
/// assert_eq!(compute_gpa(&BTreeMap::new(), &HashMap::new(), &GradeScale::standard()), None);
/// ```
pub fn compute_gpa(
    canonical: &BTreeMap<Uuid, GradeEvent>,
    credits: &HashMap<Uuid, u32>,
    scale: &GradeScale,
) -> Option<f64> {
    let (weighted, total) = canonical
        .iter()
        .filter_map(|(course_id, event)| {
            credits
                .get(course_id)
                .filter(|credits| **credits > 0)
                .map(|credits| (scale.points(event.value), f64::from(*credits)))
        })
        .fold((0.0, 0.0), |(weighted, total), (points, credits)| {
            (weighted + points * credits, total + credits)
        });
    (total > 0.0).then(|| weighted / total)
}

/// GPA response body. `gpa` is `null` when nothing has been graded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GpaSummary {
    pub gpa: Option<f64>,
    pub graded_courses: usize,
    pub graded_credits: u32,
}

impl GpaSummary {
    /// Summarise the canonical grades under `scale`.
    pub fn from_canonical(
        canonical: &BTreeMap<Uuid, GradeEvent>,
        credits: &HashMap<Uuid, u32>,
        scale: &GradeScale,
    ) -> Self {
        let counted: Vec<u32> = canonical
            .keys()
            .filter_map(|id| credits.get(id).copied())
            .filter(|c| *c > 0)
            .collect();
        Self {
            gpa: compute_gpa(canonical, credits, scale),
            graded_courses: counted.len(),
            graded_credits: counted.iter().sum(),
        }
    }
}
