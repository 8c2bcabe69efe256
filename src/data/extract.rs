use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ExtractError;

/// Marker line of PSF reports.
pub const FWHM_MARKER: &str = "Measured FWHM";
const CALIBRATED_SECTION: &str = "calibrated distances";
const UNCALIBRATED_SECTION: &str = "uncalibrated distances";
const CHANNEL_LINE: &str = "Channel 1";

static AXIS_VALUE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\b([XYZ])\b\D*?(-?\d+(?:\.\d+)?)").ok());
static PAREN_VALUE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\b(\d+\.\d+)\b\s*\(").ok());
static ANY_DECIMAL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\d+\.\d+").ok());

fn compiled(re: &'static LazyLock<Option<Regex>>) -> Result<&'static Regex, ExtractError> {
    match &**re {
        Some(re) => Ok(re),
        None => Err(ExtractError::MalformedContent(
            "pattern failed to compile".into(),
        )),
    }
}

// ---------------------------------------------------------------------------
// Report variants
// ---------------------------------------------------------------------------

/// Which extractor applies to a report, keyed by the test field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    /// `PSFo`: three FWHM values.
    Psf,
    /// `ChromDual`: one calibrated distance.
    ChromaticSingle,
    /// Any other test: three calibrated distances.
    ChromaticTriple,
}

impl ReportKind {
    pub fn for_test(test: &str) -> Self {
        match test {
            "PSFo" => ReportKind::Psf,
            "ChromDual" => ReportKind::ChromaticSingle,
            _ => ReportKind::ChromaticTriple,
        }
    }

    /// Exact number of values a valid report of this kind yields.
    pub fn expected_values(self) -> usize {
        match self {
            ReportKind::Psf | ReportKind::ChromaticTriple => 3,
            ReportKind::ChromaticSingle => 1,
        }
    }
}

/// Validated measurement of one report file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measurement {
    /// far red, red and UV channel values, each in (0, 1).
    Channels { far_red: f64, red: f64, uv: f64 },
    /// Dual-channel distance in (0, 1).
    Dual(f64),
    /// Axis-style PSF report.
    Spatial { x: f64, y: f64, z: f64 },
}

/// Raw PSF values before validation.
#[derive(Debug, Clone, PartialEq)]
pub enum PsfValues {
    /// Tab-separated values on the marker line.
    Channels(Vec<f64>),
    /// One labelled value per axis on the lines after the marker, in X, Y, Z order.
    Axes([f64; 3]),
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Extract and validate the measurement of one report file.
pub fn extract(kind: ReportKind, path: &Path) -> Result<Measurement, ExtractError> {
    let text = read_report(path)?;
    match kind {
        ReportKind::Psf => match parse_psf(&text)? {
            PsfValues::Channels(values) => {
                let [far_red, red, uv] = unit_values::<3>(kind, &values)?;
                Ok(Measurement::Channels { far_red, red, uv })
            }
            PsfValues::Axes([x, y, z]) => Ok(Measurement::Spatial { x, y, z }),
        },
        ReportKind::ChromaticSingle => {
            let [dual] = unit_values::<1>(kind, &parse_chromatic(&text)?)?;
            Ok(Measurement::Dual(dual))
        }
        ReportKind::ChromaticTriple => {
            let [far_red, red, uv] = unit_values::<3>(kind, &parse_chromatic(&text)?)?;
            Ok(Measurement::Channels { far_red, red, uv })
        }
    }
}

/// Exactly as many values as `kind` yields, each strictly between 0 and 1.
fn unit_values<const N: usize>(kind: ReportKind, values: &[f64]) -> Result<[f64; N], ExtractError> {
    let expected = kind.expected_values();
    let arity = ExtractError::ArityMismatch {
        expected,
        found: values.len(),
    };
    if values.len() != expected {
        return Err(arity);
    }
    let arr: [f64; N] = values.try_into().map_err(|_| arity)?;
    if let Some(bad) = arr.iter().find(|v| !(**v > 0.0 && **v < 1.0)) {
        return Err(ExtractError::OutOfRange(*bad));
    }
    Ok(arr)
}

/// Read a report as text. Instrument exports are not always valid UTF-8.
fn read_report(path: &Path) -> Result<String, ExtractError> {
    if !path.is_file() {
        return Err(ExtractError::FileMissing(path.to_path_buf()));
    }
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

// ---------------------------------------------------------------------------
// PSF reports
// ---------------------------------------------------------------------------

/// Find the first `Measured FWHM` line and read its values.
///
/// Two layouts occur:
/// * `Measured FWHM\tX\t0.30\t0.31\t0.29` – values on the marker line, after
///   the label field and any further label columns.
/// * a `Measured FWHM` header followed by three `X\t0.25` style lines.
pub fn parse_psf(text: &str) -> Result<PsfValues, ExtractError> {
    let mut lines = text.lines();
    while let Some(line) = lines.next() {
        if !line.contains(FWHM_MARKER) {
            continue;
        }

        let numeric: Vec<&str> = line
            .trim()
            .split('\t')
            .skip(1)
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .skip_while(|f| f.parse::<f64>().is_err())
            .collect();

        if !numeric.is_empty() {
            let values = numeric
                .iter()
                .map(|f| {
                    f.parse::<f64>().map_err(|_| {
                        ExtractError::MalformedContent(format!("'{f}' is not a number"))
                    })
                })
                .collect::<Result<Vec<f64>, _>>()?;
            return Ok(PsfValues::Channels(values));
        }

        return parse_axis_lines(lines.by_ref().take(3)).map(PsfValues::Axes);
    }
    Err(ExtractError::NotFound(FWHM_MARKER))
}

fn parse_axis_lines<'a>(lines: impl Iterator<Item = &'a str>) -> Result<[f64; 3], ExtractError> {
    let re = compiled(&AXIS_VALUE)?;
    let mut axes: [Option<f64>; 3] = [None; 3];
    let mut found = 0;

    for line in lines {
        let Some(caps) = re.captures(line) else {
            break;
        };
        let slot = match &caps[1] {
            "X" => 0,
            "Y" => 1,
            _ => 2,
        };
        if axes[slot].is_some() {
            return Err(ExtractError::MalformedContent(format!(
                "axis {} listed twice",
                &caps[1]
            )));
        }
        let value = caps[2].parse::<f64>().map_err(|_| {
            ExtractError::MalformedContent(format!("'{}' is not a number", &caps[2]))
        })?;
        axes[slot] = Some(value);
        found += 1;
    }

    match axes {
        [Some(x), Some(y), Some(z)] => Ok([x, y, z]),
        _ => Err(ExtractError::ArityMismatch { expected: 3, found }),
    }
}

// ---------------------------------------------------------------------------
// Chromatic alignment reports
// ---------------------------------------------------------------------------

/// Read the `Channel 1` row of the calibrated-distances section.
///
/// Numbers directly followed by `(` are preferred; when the row has none of
/// those every decimal number on it is taken instead.
pub fn parse_chromatic(text: &str) -> Result<Vec<f64>, ExtractError> {
    let mut in_section = false;
    let mut section_seen = false;

    for line in text.lines() {
        let lower = line.to_lowercase();
        if lower.contains(CALIBRATED_SECTION) {
            in_section = !lower.contains(UNCALIBRATED_SECTION);
            section_seen |= in_section;
            continue;
        }
        if in_section && line.trim_start().starts_with(CHANNEL_LINE) {
            return channel_values(line.trim());
        }
    }

    if section_seen {
        Err(ExtractError::NotFound(CHANNEL_LINE))
    } else {
        Err(ExtractError::NotFound("calibrated distances section"))
    }
}

fn channel_values(line: &str) -> Result<Vec<f64>, ExtractError> {
    let paren = compiled(&PAREN_VALUE)?;
    let mut raw: Vec<&str> = paren
        .captures_iter(line)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();
    if raw.is_empty() {
        raw = compiled(&ANY_DECIMAL)?
            .find_iter(line)
            .map(|m| m.as_str())
            .collect();
    }
    raw.iter()
        .map(|v| {
            v.parse::<f64>()
                .map_err(|_| ExtractError::MalformedContent(format!("'{v}' is not a number")))
        })
        .collect()
}
