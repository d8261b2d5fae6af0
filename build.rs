use anyhow::*;
use fs_extra::copy_items;
use fs_extra::dir::CopyOptions;
use std::env;
use std::path::PathBuf;

fn main() -> Result<()> {
    // Rerun whenever a model or font in /assets/ changes.
    println!("cargo:rerun-if-changed=assets");

    let out_dir = env::var("OUT_DIR")?;
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let assets_src = manifest_dir.join("assets");
    if assets_src.exists() {
        let mut copy_options = CopyOptions::new();
        copy_options.overwrite = true;
        copy_items(&[assets_src.as_path()], &out_dir, &copy_options)?;
    }

    // The viewer falls back to this copy when it is not started from the crate root.
    let bundled = PathBuf::from(&out_dir).join("assets");
    println!("cargo:rustc-env=SHOWROOM_ASSET_DIR={}", bundled.display());

    Ok(())
}
