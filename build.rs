use std::path::Path;
use std::process::Command;

const CSS_INPUT: &str = "static/css/input.css";
const CSS_OUTPUT: &str = "static/css/dist/output.css";

fn main() {
    println!("cargo:rerun-if-changed={CSS_INPUT}");
    println!("cargo:rerun-if-changed=templates/");
    println!("cargo:rerun-if-env-changed=KLAW_SKIP_CSS");

    // Offline and CI builds can skip the stylesheet; pages still render unstyled.
    if std::env::var_os("KLAW_SKIP_CSS").is_some() {
        return;
    }

    if let Some(dir) = Path::new(CSS_OUTPUT).parent() {
        if let Err(e) = std::fs::create_dir_all(dir) {
            println!("cargo:warning=cannot create {}: {e}", dir.display());
            return;
        }
    }

    let status = Command::new("npx")
        .args(["@tailwindcss/cli", "-i", CSS_INPUT, "-o", CSS_OUTPUT, "--minify"])
        .status();

    match status {
        Ok(s) if s.success() => {}
        Ok(s) => println!("cargo:warning=tailwind build exited with {s}"),
        Err(e) => println!("cargo:warning=tailwind not available ({e}); {CSS_OUTPUT} not rebuilt"),
    }
}
