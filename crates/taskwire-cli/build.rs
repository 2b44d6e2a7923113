use std::process::Command;

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    Some(text.trim().to_string())
}

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");

    let sha = git(&["rev-parse", "--short", "HEAD"]);
    let dirty = match (&sha, Command::new("git").args(["diff", "--quiet"]).status()) {
        (Some(_), Ok(status)) if !status.success() => ".dirty",
        _ => "",
    };
    let sha = sha.unwrap_or_else(|| "nogit".to_string());

    println!("cargo:rustc-env=TASKWIRE_GIT_SHA={}", sha);
    println!("cargo:rustc-env=TASKWIRE_GIT_DIRTY={}", dirty);
}
