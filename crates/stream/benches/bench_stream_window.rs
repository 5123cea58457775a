use std::hint::black_box;
use std::time::Instant;

use tileworld_stream::{ChunkStreamer, ChunkWindow, WindowConfig};

fn bench_walk(radius: i32, iterations: usize) {
    let mut window = ChunkWindow::new(WindowConfig { radius });

    let start = Instant::now();
    for i in 0..iterations {
        // Walk east a few tiles per step, crossing a chunk every 8 steps.
        let tile_x = (i as i32) * 4;
        let _ = black_box(window.update(black_box(tile_x), black_box(0)));
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!(
        "  walk (r={radius}, {iterations} iters): {per_iter:?}/iter, total {elapsed:?}, loads {}",
        window.stats().total_loads
    );
}

fn bench_teleport(radius: i32, iterations: usize) {
    let mut window = ChunkWindow::new(WindowConfig { radius });

    let start = Instant::now();
    for i in 0..iterations {
        let tile = if i % 2 == 0 { 0 } else { 1 << 20 };
        let _ = black_box(window.update(black_box(tile), black_box(tile)));
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!(
        "  teleport (r={radius}, {iterations} iters): {per_iter:?}/iter, total {elapsed:?}"
    );
}

fn bench_command_encoding(radius: i32, iterations: usize) {
    let streamer = ChunkStreamer::new(1, WindowConfig { radius });
    let mut window = ChunkWindow::new(WindowConfig { radius });
    window.update(0, 0);
    let delta = window.update(1 << 12, 0);

    let start = Instant::now();
    for _ in 0..iterations {
        let _ = black_box(streamer.commands_for(black_box(&delta)));
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!(
        "  command encoding (r={radius}, {} chunks, {iterations} iters): {per_iter:?}/iter, total {elapsed:?}",
        delta.loads.len() + delta.unloads.len()
    );
}

fn main() {
    println!("=== Stream Window Benchmarks ===\n");

    println!("Walk:");
    bench_walk(2, 100_000);
    bench_walk(8, 10_000);

    println!("\nTeleport (full window swap):");
    bench_teleport(2, 10_000);
    bench_teleport(8, 1_000);

    println!("\nDelta to commands:");
    bench_command_encoding(2, 10_000);
    bench_command_encoding(8, 1_000);

    println!("\n=== Done ===");
}
