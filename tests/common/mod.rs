//! Shared fixtures: a synthetic clinical records CSV whose outcome is
//! predictable from the features, so trained models beat chance.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const HEADER: &str = "age,anaemia,creatinine_phosphokinase,diabetes,ejection_fraction,\
high_blood_pressure,platelets,serum_creatinine,serum_sodium,sex,smoking,time,DEATH_EVENT";

/// Write `rows` synthetic subjects to `dir/records.csv`. Subjects with a
/// death event skew old, with low ejection fraction, high serum creatinine
/// and short follow-up time, so the groups are separable.
pub fn write_synthetic_records(dir: &Path, rows: usize, seed: u64) -> PathBuf {
    let path = dir.join("records.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "{HEADER}").unwrap();

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    for _ in 0..rows {
        let death = rng.gen_bool(0.35);

        let (age, ejection, creatinine, sodium, time) = if death {
            (
                70.0 + rng.gen_range(-8.0..8.0),
                25.0 + rng.gen_range(-8.0..8.0),
                2.2 + rng.gen_range(-0.6..0.6),
                132.0 + rng.gen_range(-4.0..4.0),
                rng.gen_range(4.0..120.0),
            )
        } else {
            (
                54.0 + rng.gen_range(-8.0..8.0),
                46.0 + rng.gen_range(-10.0..10.0),
                1.1 + rng.gen_range(-0.3..0.3),
                138.0 + rng.gen_range(-3.0..3.0),
                rng.gen_range(90.0..285.0),
            )
        };

        writeln!(
            file,
            "{:.1},{},{:.0},{},{:.1},{},{:.0},{:.2},{:.1},{},{},{:.0},{}",
            age,
            rng.gen_range(0..2),
            rng.gen_range(50.0..800.0),
            rng.gen_range(0..2),
            ejection,
            rng.gen_range(0..2),
            rng.gen_range(150_000.0..400_000.0),
            creatinine,
            sodium,
            rng.gen_range(0..2),
            rng.gen_range(0..2),
            time,
            u8::from(death),
        )
        .unwrap();
    }
    path
}
