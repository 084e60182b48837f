#![cfg(unix)]

use std::fs;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::thread;

use flate2::Compression;
use flate2::write::GzEncoder;

use marvel_models::config::{
    ENV_ARCHIVE_URL, ENV_HMMPRESS, ENV_MODELS_URL, HMM_DATABASE, MODEL_FILES,
};

const USAGE: &str = "Usage: [Dest_Dir] [Tmp_Dir]";

fn archive_bytes() -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (name, content) in [
        ("AllvogHMMprofiles/VOG00001.hmm", &b"HMMER3/f\nNAME VOG00001\n//\n"[..]),
        ("AllvogHMMprofiles/VOG00002.hmm", &b"HMMER3/f\nNAME VOG00002\n//\n"[..]),
    ] {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        builder.append_data(&mut header, name, content).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

fn handle(mut stream: TcpStream, archive: &[u8]) {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => return,
            Ok(n) => request.extend_from_slice(&buf[..n]),
        }
    }
    let line = String::from_utf8_lossy(&request);
    let path = line.split_whitespace().nth(1).unwrap_or("/");
    let body: &[u8] = if path.ends_with(".tar.gz") {
        archive
    } else {
        b"pickled model"
    };
    let head = format!(
        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(body);
}

/// Serves the profile archive for `*.tar.gz` and a small payload for anything else.
fn serve_files() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let archive = archive_bytes();
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            handle(stream, &archive);
        }
    });
    format!("http://{addr}")
}

fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/AllvogHMMprofiles.tar.gz")
}

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn run_cli(args: &[&str], envs: &[(&str, &str)]) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_marvel-models"));
    cmd.args(args);
    for key in [
        "RUST_LOG",
        ENV_ARCHIVE_URL,
        ENV_MODELS_URL,
        ENV_HMMPRESS,
        "HTTP_PROXY",
        "http_proxy",
        "ALL_PROXY",
        "all_proxy",
    ] {
        cmd.env_remove(key);
    }
    for (key, value) in envs {
        cmd.env(key, value);
    }
    cmd.output().unwrap()
}

struct Dirs {
    _temp: tempfile::TempDir,
    root: PathBuf,
    dest: String,
    tmp: String,
}

fn dirs() -> Dirs {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path().to_path_buf();
    let dest = format!("{}/models/", root.display());
    let tmp = format!("{}/scratch/", root.display());
    Dirs {
        _temp: temp,
        root,
        dest,
        tmp,
    }
}

fn lines(bytes: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn reports_found_database_without_changes() {
    let dirs = dirs();
    fs::create_dir_all(&dirs.dest).unwrap();
    fs::write(format!("{}{HMM_DATABASE}.h3m", dirs.dest), b"idx").unwrap();
    fs::write(format!("{}{}", dirs.dest, MODEL_FILES[0]), b"model").unwrap();

    let output = run_cli(&[dirs.dest.as_str(), dirs.tmp.as_str()], &[]);

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "INFO: HMM Database found.\n\n");
    let stderr = lines(&output.stderr);
    assert_eq!(stderr[0], USAGE);
    assert_eq!(stderr[1], format!("Destination directory: {}", dirs.dest));
    assert_eq!(stderr[2], format!("Temp directory: {}", dirs.tmp));
    assert!(!Path::new(&dirs.tmp).exists());
    assert_eq!(fs::read_dir(&dirs.dest).unwrap().count(), 2);
}

#[test]
fn installs_end_to_end() {
    let dirs = dirs();
    let base = serve_files();
    let archive_url = format!("{base}/AllvogHMMprofiles.tar.gz");
    let models_url = format!("{base}/models/");
    let press = write_script(&dirs.root, "hmmpress-ok", "touch \"$1.h3m\" \"$1.h3i\"");

    let output = run_cli(
        &[dirs.dest.as_str(), dirs.tmp.as_str()],
        &[
            (ENV_ARCHIVE_URL, archive_url.as_str()),
            (ENV_MODELS_URL, models_url.as_str()),
            (ENV_HMMPRESS, press.to_str().unwrap()),
        ],
    );

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(output.stdout.is_empty());
    let stderr = lines(&output.stderr);
    assert_eq!(stderr[0], USAGE);
    assert_eq!(stderr.last().map(String::as_str), Some("Done."));
    for file in MODEL_FILES {
        assert_eq!(fs::read(format!("{}{file}", dirs.dest)).unwrap(), b"pickled model");
    }
    assert!(Path::new(&format!("{}{HMM_DATABASE}.h3m", dirs.dest)).is_file());
    assert!(!Path::new(&format!("{}AllvogHMMprofiles.tar.gz", dirs.tmp)).exists());
    assert!(!Path::new(&format!("{}AllvogHMMprofiles", dirs.tmp)).exists());
}

#[test]
fn indexer_failure_shows_command_and_tool_output() {
    let dirs = dirs();
    let base = serve_files();
    let archive_url = format!("{base}/AllvogHMMprofiles.tar.gz");
    let models_url = format!("{base}/models/");
    let press = write_script(
        &dirs.root,
        "hmmpress-broken",
        "echo 'Error: File format problem in trying to open HMM file' >&2\nexit 1",
    );

    let output = run_cli(
        &[dirs.dest.as_str(), dirs.tmp.as_str()],
        &[
            (ENV_ARCHIVE_URL, archive_url.as_str()),
            (ENV_MODELS_URL, models_url.as_str()),
            (ENV_HMMPRESS, press.to_str().unwrap()),
        ],
    );

    assert_eq!(output.status.code(), Some(4));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("FATAL ERROR: "));
    let command = format!("{} \"{}{HMM_DATABASE}\"", press.display(), dirs.dest);
    assert!(stdout.contains(&command), "{stdout}");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("File format problem"), "{stderr}");
    assert!(!stderr.contains("Done."));
}

#[test]
fn unreachable_archive_fails_extraction() {
    let dirs = dirs();
    fs::create_dir_all(&dirs.tmp).unwrap();
    fs::write(format!("{}AllvogHMMprofiles.tar.gz", dirs.tmp), archive_bytes()).unwrap();

    let archive_url = closed_port_url();
    let output = run_cli(
        &[dirs.dest.as_str(), dirs.tmp.as_str()],
        &[(ENV_ARCHIVE_URL, archive_url.as_str())],
    );

    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("FATAL ERROR: Unable to extract database"));
    let stderr = lines(&output.stderr);
    assert!(!stderr.iter().any(|line| line == "[3] Downloading models"));
    assert!(!Path::new(&format!("{}{HMM_DATABASE}", dirs.dest)).exists());
}

#[test]
fn extra_arguments_are_a_usage_error() {
    let dirs = dirs();
    let output = run_cli(&[dirs.dest.as_str(), dirs.tmp.as_str(), "extra"], &[]);

    assert_eq!(output.status.code(), Some(2));
    assert_eq!(lines(&output.stderr)[0], USAGE);
    assert!(!Path::new(&dirs.dest).exists());
}
