//! Keystore seeding.
//!
//! A fresh node gets the development account funded by the default
//! genesis, so stake transactions can be signed right after `init`.

use std::{fs, io::Write, path::Path};

use eyre::{Result, WrapErr};
use tracing::{error, info};

/// Encrypted v3 key files written into every new keystore, by file name
pub const KEYSTORE_FILES: &[(&str, &str)] = &[(
    "UTC--2016-10-21T22-30-03.071787745Z--7eff122b94897ea5b0e2a9abf47b86337fafebdc",
    r#"
{
  "address":"7eff122b94897ea5b0e2a9abf47b86337fafebdc",
  "id":"f86a62b4-0621-4616-99af-c4b7f38fcc48","version":3,
  "crypto":{
    "cipher":"aes-128-ctr","ciphertext":"19de8a919e2f4cbdde2b7352ebd0be8ead2c87db35fc8e4c9acaf74aaaa57dad",
    "cipherparams":{"iv":"ba2bd370d6c9d5845e92fbc6f951c792"},
    "kdf":"scrypt","kdfparams":{"dklen":32,"n":262144,"p":1,"r":8,"salt":"c7cc2380a96adc9eb31d20bd8d8a7827199e8b16889582c0b9089da6a9f58e84"},
    "mac":"ff2c0caf051ca15d8c43b6f321ec10bd99bd654ddcf12dd1a28f730cc3c13730"
  }
}
"#,
)];

/// Write the seed key files into `dir`
///
/// A file that cannot be written is logged and skipped.
///
/// # Returns
///
/// * Number of key files written
pub fn seed_keystore(dir: &Path) -> Result<usize> {
    fs::create_dir_all(dir).wrap_err_with(|| format!("Failed to create keystore dir {}", dir.display()))?;

    let mut written = 0;
    for (name, content) in KEYSTORE_FILES {
        let path = dir.join(name);
        let mut file = match fs::File::create(&path) {
            Ok(file) => file,
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to create key file");
                continue;
            }
        };
        if let Err(e) = file.write_all(content.as_bytes()) {
            error!(path = %path.display(), error = %e, "Failed to write key file");
            continue;
        }
        file.sync_all()
            .wrap_err_with(|| format!("Failed to close {}", path.display()))?;
        written += 1;
    }

    info!(dir = %dir.display(), files = written, "Seeded keystore");
    Ok(written)
}
