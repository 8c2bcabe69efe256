use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Days, NaiveDate};

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Value around `center`, spread by ±`jitter`.
    fn around(&mut self, center: f64, jitter: f64) -> f64 {
        center + (self.next_f64() * 2.0 - 1.0) * jitter
    }
}

fn psf_tabbed(rng: &mut SimpleRng, drift: f64) -> String {
    format!(
        "PSF bead report\nObjective\tPlan-Apochromat\nMeasured FWHM\tX\t{:.4}\t{:.4}\t{:.4}\nTheoretical FWHM\t0.21\t0.19\t0.16\n",
        rng.around(0.30 * drift, 0.01),
        rng.around(0.26 * drift, 0.01),
        rng.around(0.22 * drift, 0.01),
    )
}

fn psf_axes(rng: &mut SimpleRng) -> String {
    format!(
        "PSF bead report\nMeasured FWHM (um)\nX\t{:.4}\nY\t{:.4}\nZ\t{:.4}\n",
        rng.around(0.25, 0.01),
        rng.around(0.26, 0.01),
        rng.around(0.70, 0.03),
    )
}

fn chromatic(rng: &mut SimpleRng, channels: usize) -> String {
    let uncal: Vec<String> = (0..channels)
        .map(|_| format!("{:.3} (px)", rng.around(2.5, 0.5)))
        .collect();
    let cal: Vec<String> = (0..channels)
        .map(|_| format!("{:.4} (um)", rng.around(0.08, 0.02)))
        .collect();
    format!(
        "Chromatic aberration report\nUncalibrated distances\nChannel 1\t{}\nCalibrated distances\nChannel 0\t0.0000 (um)\nChannel 1\t{}\n",
        uncal.join("\t"),
        cal.join("\t"),
    )
}

fn write(root: &Path, rel: &str, contents: &str) -> Result<()> {
    let path: PathBuf = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    std::fs::write(&path, contents).with_context(|| format!("writing {}", path.display()))
}

fn main() -> Result<()> {
    env_logger::init();

    let mut rng = SimpleRng::new(42);
    let root = PathBuf::from(std::env::args().nth(1).unwrap_or_else(|| "sample_data".into()));
    let data = root.join("data");
    let start = NaiveDate::from_ymd_opt(2024, 1, 8).context("start date")?;

    let microscopes = ["LSM980", "LSM900"];
    let objectives = ["63x", "20x"];
    let weeks = 6u64;
    let mut files = 0;

    for week in 0..weeks {
        let date = start
            .checked_add_days(Days::new(week * 7))
            .context("date overflow")?
            .format("%Y%m%d");
        // The last LSM980 week drifts upwards by 25 %.
        for microscope in microscopes {
            let drift = if microscope == "LSM980" && week == weeks - 1 { 1.25 } else { 1.0 };
            for objective in objectives {
                let stem = format!("{date}_M{microscope}_O{objective}");
                write(
                    &data,
                    &format!("{microscope}/{stem}_TPSFo_S100nm_B1/report.xls"),
                    &psf_tabbed(&mut rng, drift),
                )?;
                write(
                    &data,
                    &format!("{microscope}/{stem}_TChromDual_S500nm_B2/report.xls"),
                    &chromatic(&mut rng, 1),
                )?;
                write(
                    &data,
                    &format!("{microscope}/{stem}_TChromTriple_S500nm_B3/report.xls"),
                    &chromatic(&mut rng, 3),
                )?;
                files += 3;
            }
        }
    }

    write(
        &data,
        "LSM980/20240108_MLSM980_O63x_TPSFo_S100nm_B9/axes.xls",
        &psf_axes(&mut rng),
    )?;
    write(
        &data,
        "LSM980/20240108_MLSM980_O63x_TPSFo_S100nm_B8/empty.xls",
        "PSF bead report\nno measurement\n",
    )?;
    write(&data, "misc/notes.xls", "operator notes\n")?;
    files += 3;

    println!("Wrote {files} report files under {}", data.display());
    Ok(())
}
