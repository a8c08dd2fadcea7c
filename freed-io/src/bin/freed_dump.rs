//! CLI tool for inspecting raw FreeD traffic.
//!
//! Prints every datagram as hex together with its decoding under each
//! supported profile, which is the quickest way to find out which layout a
//! tracking head actually sends.
//!
//! # Usage
//!
//! ```bash
//! freed_dump                     # listen on 0.0.0.0:19148
//! freed_dump --port 6301 --count 20
//! freed_dump --bind 192.168.1.20
//! ```

use freed_io::protocol::{PacketDecoder, Profile, hex_preview};
use std::env;
use std::io::ErrorKind;
use std::net::UdpSocket;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

const MAX_DATAGRAM_SIZE: usize = 1024;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = env::args().collect();
    let config = match parse_args(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage(&args[0]);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

struct Config {
    bind: String,
    port: u16,
    count: Option<u64>,
}

fn parse_args(args: &[String]) -> Result<Config, String> {
    let mut bind = "0.0.0.0".to_string();
    let mut port = 19148u16;
    let mut count = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" | "-p" => {
                let value = args.get(i + 1).ok_or("--port needs a value")?;
                port = value
                    .parse()
                    .map_err(|_| format!("Invalid port: {}", value))?;
                i += 1;
            }
            "--bind" | "-b" => {
                bind = args.get(i + 1).ok_or("--bind needs a value")?.clone();
                i += 1;
            }
            "--count" | "-n" => {
                let value = args.get(i + 1).ok_or("--count needs a value")?;
                count = Some(
                    value
                        .parse()
                        .map_err(|_| format!("Invalid count: {}", value))?,
                );
                i += 1;
            }
            "--help" | "-h" => {
                return Err("Help requested".to_string());
            }
            _ => {
                return Err(format!("Unknown argument: {}", args[i]));
            }
        }
        i += 1;
    }

    Ok(Config { bind, port, count })
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} [OPTIONS]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -b, --bind <ADDR>   Interface to listen on (default 0.0.0.0)");
    eprintln!("  -p, --port <PORT>   UDP port (default 19148)");
    eprintln!("  -n, --count <N>     Exit after N datagrams");
    eprintln!("  -h, --help          Show this help");
}

fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let socket = UdpSocket::bind((config.bind.as_str(), config.port))?;
    socket.set_read_timeout(Some(Duration::from_millis(200)))?;
    println!("Listening on {}", socket.local_addr()?);

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || r.store(false, Ordering::Relaxed))?;

    let decoders: Vec<PacketDecoder> = [Profile::A, Profile::B, Profile::C]
        .into_iter()
        .map(PacketDecoder::for_profile)
        .collect();

    let start = Instant::now();
    let mut buffer = [0u8; MAX_DATAGRAM_SIZE];
    let mut received = 0u64;

    while running.load(Ordering::Relaxed) {
        let (len, src) = match socket.recv_from(&mut buffer) {
            Ok(result) => result,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => continue,
            Err(e) => return Err(e.into()),
        };
        received += 1;

        let data = &buffer[..len];
        println!(
            "[{:10.3}] #{} {} bytes from {}",
            start.elapsed().as_secs_f64(),
            received,
            len,
            src
        );
        println!("  HEX: {}", hex_preview(data, MAX_DATAGRAM_SIZE));

        for decoder in &decoders {
            let profile = decoder.layout().profile;
            match decoder.decode(data) {
                Ok(t) => {
                    print!(
                        "  {}: pan {:8.3}° tilt {:8.3}° zoom {:#08x}",
                        profile, t.pan_deg, t.tilt_deg, t.zoom_raw
                    );
                    if let Some(pos) = t.position {
                        print!(" pos ({:.3}, {:.3}, {:.3}) m", pos.x, pos.y, pos.z);
                    }
                    println!();
                }
                Err(e) => println!("  {}: {}", profile, e),
            }
        }

        if config.count.is_some_and(|n| received >= n) {
            break;
        }
    }

    println!("{} datagrams received", received);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("freed_dump")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = parse_args(&args(&[])).unwrap();
        assert_eq!(config.bind, "0.0.0.0");
        assert_eq!(config.port, 19148);
        assert!(config.count.is_none());
    }

    #[test]
    fn test_options() {
        let config = parse_args(&args(&["-p", "6301", "--count", "5", "-b", "127.0.0.1"])).unwrap();
        assert_eq!(config.port, 6301);
        assert_eq!(config.count, Some(5));
        assert_eq!(config.bind, "127.0.0.1");
    }

    #[test]
    fn test_bad_arguments() {
        assert!(parse_args(&args(&["--port", "abc"])).is_err());
        assert!(parse_args(&args(&["--port"])).is_err());
        assert!(parse_args(&args(&["--verbose"])).is_err());
    }
}
