//! FreeD test pattern sender
//!
//! Streams synthetic profile B packets to a running `freed-io` daemon: a slow
//! pan/tilt orbit with a zoom ramp, at 50 Hz. Useful for checking smoothing,
//! calibration and idle fallback without a tracking head.
//!
//! ```sh
//! cargo run --example test_pattern -- 127.0.0.1:19148 20
//! #                                    target          seconds (0 = forever)
//! ```

use std::env;
use std::net::UdpSocket;
use std::thread;
use std::time::{Duration, Instant};

const RATE_HZ: f64 = 50.0;

/// Profile B frame: pan @3, tilt @6, zoom @21
fn encode_profile_b(pan_deg: f64, tilt_deg: f64, zoom_raw: u32) -> [u8; 26] {
    let mut buf = [0u8; 26];
    buf[0] = 0xD1;
    let pan = (pan_deg / 180.0 * 32768.0).round() as i32;
    let tilt = (tilt_deg / 120.0 * 32768.0).round() as i32;
    buf[3..6].copy_from_slice(&pan.to_be_bytes()[1..4]);
    buf[6..9].copy_from_slice(&tilt.to_be_bytes()[1..4]);
    buf[21..24].copy_from_slice(&zoom_raw.to_be_bytes()[1..4]);
    buf
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    let target = args.get(1).map(String::as_str).unwrap_or("127.0.0.1:19148");
    let seconds: f64 = match args.get(2) {
        Some(s) => s.parse()?,
        None => 20.0,
    };

    let socket = UdpSocket::bind("0.0.0.0:0")?;
    log::info!("Sending FreeD test pattern to {} at {} Hz", target, RATE_HZ);

    let period = Duration::from_secs_f64(1.0 / RATE_HZ);
    let start = Instant::now();
    let mut sent = 0u64;

    loop {
        let t = start.elapsed().as_secs_f64();
        if seconds > 0.0 && t >= seconds {
            break;
        }

        let pan = 45.0 * (t * 0.4).sin();
        let tilt = 3.0 + 10.0 * (t * 0.25).cos();
        let zoom = ((t * 0.1).sin().abs() * 0x40_0000 as f64) as u32;

        socket.send_to(&encode_profile_b(pan, tilt, zoom), target)?;
        sent += 1;
        if sent % (RATE_HZ as u64 * 5) == 0 {
            log::info!("{} packets sent (pan {:.1}° tilt {:.1}°)", sent, pan, tilt);
        }

        thread::sleep(period);
    }

    log::info!("Done: {} packets", sent);
    Ok(())
}
