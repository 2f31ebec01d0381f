//! Random CSV test data in the `colid,cola,colb,colc` layout.

use crate::error::CliError;
use rand::{Rng, SeedableRng, distributions::Alphanumeric, rngs::StdRng};
use std::io::Write;

pub const HEADER: [&str; 4] = ["colid", "cola", "colb", "colc"];
const TEXT_LEN: usize = 10;

pub struct GeneratorOptions {
    pub rows: usize,
    pub sequential: bool,
    pub seed: Option<u64>,
}

/// Writes `rows` data rows plus a header. Sequential ids run `0..rows`;
/// random ids are drawn from `0..rows²`, so duplicates are possible.
pub fn generate<W: Write>(writer: W, options: &GeneratorOptions) -> Result<(), CliError> {
    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let id_range = (options.rows as u64).saturating_mul(options.rows as u64).max(1);

    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(HEADER)?;
    for i in 0..options.rows {
        let id = if options.sequential {
            i as u64
        } else {
            rng.gen_range(0..id_range)
        };
        csv.write_record([
            id.to_string(),
            random_text(&mut rng),
            random_text(&mut rng),
            random_text(&mut rng),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

fn random_text<R: Rng>(rng: &mut R) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(TEXT_LEN)
        .map(char::from)
        .collect()
}
