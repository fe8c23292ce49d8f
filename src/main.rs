//! ringsock demo
//!
//! Runs three quick benchmarks and prints the numbers:
//! - Ring Buffer: write/read throughput of the byte FIFO
//! - Binary Codec: fixed-width and varint encode/decode
//! - Loopback: bytes pushed through a real `Connection`
//!
//! Logging follows `RUST_LOG` (default `info`).

use std::io::{Cursor, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

use ringsock::core::RingBuffer;
use ringsock::network::Connection;
use ringsock::protocol::{BinaryReader, BinaryWriter};
use ringsock::{ConnectionConfig, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("ringsock - buffered socket + binary codec");
    println!("=========================================\n");

    let result = benchmark_ring_buffer()
        .and_then(|_| benchmark_codec())
        .and_then(|_| benchmark_loopback());

    match result {
        Ok(()) => println!("\nAll benchmarks complete!"),
        Err(err) => {
            error!(error = %err, "benchmark failed");
            std::process::exit(1);
        }
    }
}

fn benchmark_ring_buffer() -> Result<()> {
    println!("Ring Buffer Benchmark (mutex-guarded byte FIFO)");
    println!("-----------------------------------------------");

    const ITERATIONS: usize = 1_000_000;
    const CHUNK: usize = 64;
    let rb = RingBuffer::new(8192)?;
    let chunk = [0x5Au8; CHUNK];
    let mut out = [0u8; CHUNK];

    let start = Instant::now();
    for _ in 0..ITERATIONS {
        rb.write(&chunk);
        rb.read(&mut out);
    }
    let duration = start.elapsed();

    let ns = duration.as_nanos() as f64 / ITERATIONS as f64;
    println!("  Chunk size:   {} bytes", CHUNK);
    println!("  Operations:   {}", ITERATIONS);
    println!("  Write+read:   {:.2} ns/op", ns);
    println!(
        "  Throughput:   {:.2} MB/sec\n",
        (ITERATIONS * CHUNK) as f64 / duration.as_secs_f64() / 1_000_000.0
    );
    Ok(())
}

fn benchmark_codec() -> Result<()> {
    println!("Codec Benchmark (little-endian + varints)");
    println!("-----------------------------------------");

    const ITERATIONS: usize = 1_000_000;
    let mut buffer = Vec::with_capacity(ITERATIONS * 24);

    let start = Instant::now();
    {
        let mut writer = BinaryWriter::new(&mut buffer);
        for i in 0..ITERATIONS {
            writer.write_u32(i as u32)?;
            writer.write_f64(i as f64)?;
            writer.write_varuint7(i as u64, 9)?;
            writer.write_varsint7(-(i as i64), 9)?;
        }
    }
    let encode_duration = start.elapsed();

    let start = Instant::now();
    let mut reader = BinaryReader::new(Cursor::new(&buffer[..]));
    for i in 0..ITERATIONS {
        let value = reader.read_u32()?;
        reader.read_f64()?;
        reader.read_varuint7(9)?;
        reader.read_varsint7(9)?;
        debug_assert_eq!(value, i as u32);
    }
    let decode_duration = start.elapsed();

    println!("  Records:      {} ({} bytes)", ITERATIONS, buffer.len());
    println!(
        "  Encode:       {:.2} ns/record",
        encode_duration.as_nanos() as f64 / ITERATIONS as f64
    );
    println!(
        "  Decode:       {:.2} ns/record\n",
        decode_duration.as_nanos() as f64 / ITERATIONS as f64
    );
    Ok(())
}

fn benchmark_loopback() -> Result<()> {
    println!("Loopback Benchmark (Connection over TCP)");
    println!("----------------------------------------");

    const TOTAL: usize = 64 * 1024 * 1024;
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    info!(%addr, "loopback listener ready");

    let sender = thread::spawn(move || -> std::io::Result<()> {
        let (mut stream, _) = listener.accept()?;
        stream.set_nodelay(true)?;
        let chunk = vec![0xC3u8; 64 * 1024];
        let mut sent = 0;
        while sent < TOTAL {
            stream.write_all(&chunk)?;
            sent += chunk.len();
        }
        Ok(())
    });

    let config = ConnectionConfig::default()
        .with_buffer_capacity(256 * 1024)
        .with_poll_interval(Duration::from_millis(1));
    let conn = Connection::with_config(TcpStream::connect(addr)?, config)?;

    let start = Instant::now();
    let mut received = 0;
    let mut chunk = vec![0u8; 64 * 1024];
    while conn.wait_available()? > 0 {
        received += conn.receive(&mut chunk)?;
    }
    let duration = start.elapsed();

    if let Ok(Err(err)) = sender.join() {
        error!(error = %err, "loopback sender failed");
    }

    println!("  Bytes:        {} MB", received / (1024 * 1024));
    println!("  Duration:     {:.2} ms", duration.as_secs_f64() * 1000.0);
    println!(
        "  Throughput:   {:.2} MB/sec",
        received as f64 / duration.as_secs_f64() / 1_000_000.0
    );
    Ok(())
}
