use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Only the SDL2 window needs native libraries.
    if env::var_os("CARGO_FEATURE_GUI").is_none() {
        return;
    }
    link_sdl2_libraries();
}

fn link_sdl2_libraries() {
    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();

    match target_os.as_str() {
        "macos" => {
            if !is_homebrew_available() {
                println!("cargo:warning=Homebrew not found; install SDL2 and SDL2_ttf manually");
                return;
            }
            for (package, lib) in [("sdl2", "SDL2"), ("sdl2_ttf", "SDL2_ttf")] {
                match get_homebrew_path(package) {
                    Ok(path) => {
                        println!("cargo:rustc-link-search={}/lib", path);
                        println!("cargo:rustc-link-lib={}", lib);
                    }
                    Err(e) => println!("cargo:warning={} (try 'brew install {}')", e, package),
                }
            }
        }
        "linux" => {
            // libsdl2-dev and libsdl2-ttf-dev must be installed; pkg paths are standard.
        }
        _ => {
            println!("cargo:warning=make sure SDL2 and SDL2_ttf are on the library path");
        }
    }
}

fn is_homebrew_available() -> bool {
    Command::new("brew").arg("--version").output().is_ok()
}

fn get_homebrew_path(package: &str) -> Result<String, String> {
    match Command::new("brew").args(["--prefix", package]).output() {
        Ok(output) if output.status.success() => {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        }
        Ok(_) => Err(format!("package {} not found in homebrew", package)),
        Err(e) => Err(format!("failed to execute brew: {}", e)),
    }
}
