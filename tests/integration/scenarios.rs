//! End-to-end scenarios checked on the PCM output.

use approx::assert_abs_diff_eq;
use arbor::core::TopologyError;
use arbor::prelude::*;
use std::sync::{Arc, Mutex};
use std::thread;

#[path = "../helpers/mod.rs"]
mod helpers;
use helpers::tolerances::*;
use helpers::*;

#[test]
fn test_mono_source_through_stereo_bus() {
    let engine = test_engine();
    engine
        .graph(|w| {
            let mut bus = Node::new(Passthrough::new(1, 2).unwrap());
            bus.add_child(
                Node::new(Constant::mono(0.5).unwrap())
                    .with_channel_map(&[0])
                    .unwrap(),
            )?;
            w.add(bus)
        })
        .unwrap()
        .unwrap();

    let samples = decode(&engine.render_blocks(1).unwrap());
    assert_eq!(samples.len(), 2 * TEST_BLOCK_SIZE);
    assert_all_near(&channel(&samples, 2, 0), 0.5, INT16_EPSILON);
    assert_all_near(&channel(&samples, 2, 1), 0.5, INT16_EPSILON);
}

#[test]
fn test_child_levels_sum() {
    let engine = test_engine_with(1, TEST_BLOCK_SIZE);
    engine
        .graph(|w| {
            let mut bus = Node::new(Passthrough::new(1, 1).unwrap());
            bus.add_child(Node::new(Constant::mono(1.0).unwrap()).with_level(0.5).unwrap())?;
            bus.add_child(Node::new(Constant::mono(1.0).unwrap()).with_level(0.3).unwrap())?;
            w.add(bus)
        })
        .unwrap()
        .unwrap();

    let samples = decode(&engine.render_blocks(2).unwrap());
    assert_all_near(&samples, 0.8, INT16_EPSILON + FLOAT_EPSILON);
}

#[test]
fn test_bus_processes_after_mixing() {
    let engine = test_engine_with(1, TEST_BLOCK_SIZE);
    engine
        .graph(|w| {
            // Two quiet children summed to 0.5, then shaped as one signal.
            let mut bus = Node::new(Sharpen::new(1).unwrap());
            bus.add_child(Node::new(Constant::mono(0.25).unwrap()))?;
            bus.add_child(Node::new(Constant::mono(0.25).unwrap()))?;
            let handle = w.add(bus)?;
            handle
                .set_parameter("distortion", ParamValue::Float(0.5))
                .unwrap();
            Ok::<_, TopologyError>(())
        })
        .unwrap()
        .unwrap();

    // x = 0.5, k = 2: 0.5 * 3 / 2. Shaping each child first would give 1.0.
    let samples = decode(&engine.render_blocks(1).unwrap());
    assert_all_near(&samples, 0.75, INT16_EPSILON + DSP_EPSILON);
}

#[test]
fn test_master_clamps_overload() {
    let engine = test_engine();
    engine
        .graph(|w| {
            w.add(Node::new(Constant::mono(0.8).unwrap()))?;
            // Both channels of the second source land on the right.
            w.add(
                Node::new(Constant::new(-0.8, 2).unwrap())
                    .with_channel_map(&[1, 1])
                    .unwrap(),
            )
        })
        .unwrap()
        .unwrap();

    let raw = decode_i16(&engine.render_blocks(1).unwrap());
    let left: Vec<i16> = raw.iter().step_by(2).copied().collect();
    let right: Vec<i16> = raw.iter().skip(1).step_by(2).copied().collect();
    assert!(left.iter().all(|&s| s == sample(0.8)));
    assert!(right.iter().all(|&s| s == -32767));
}

fn sample(value: f32) -> i16 {
    arbor::core::pcm::sample_to_i16(value)
}

#[test]
fn test_oneshot_plays_once_and_reports_end() {
    let engine = test_engine_with(1, TEST_BLOCK_SIZE);
    let data: Vec<f32> = (1..=6).map(|i| i as f32 / 10.0).collect();
    let shot = engine
        .graph(|w| w.add(Node::new(OneShot::new(data, 1).unwrap())))
        .unwrap()
        .unwrap();

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    shot.subscribe(move |e: &NodeEvent| sink.lock().unwrap().push(*e));

    let samples = decode(&engine.render_blocks(3).unwrap());
    let expected = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
    for (got, want) in samples.iter().zip(expected) {
        assert!((got - want).abs() <= INT16_EPSILON, "{} vs {}", got, want);
    }
    assert!(!shot.is_active());

    assert_eq!(engine.dispatch_events(), 2);
    assert_eq!(
        *events.lock().unwrap(),
        vec![NodeEvent::EndOfContent, NodeEvent::ActiveChanged(false)]
    );

    // Reactivating plays again from the top.
    shot.set_active(true);
    let again = decode(&engine.render_blocks(1).unwrap());
    assert!((again[0] - 0.1).abs() <= INT16_EPSILON);
}

#[test]
fn test_sine_reaches_expected_rms() {
    let engine = test_engine_with(1, 480);
    engine
        .graph(|w| w.add(Node::new(Sine::new(1000.0, 1).unwrap())))
        .unwrap()
        .unwrap();

    let samples = decode(&engine.render_blocks(10).unwrap());
    assert_has_audio(&samples, 0.7);
    assert_abs_diff_eq!(rms(&samples), std::f32::consts::FRAC_1_SQRT_2, epsilon = 0.01);
    assert!(peak(&samples) <= 1.0);
}

/// The audio thread never observes half a swap: each pulled block comes
/// entirely from one world.
#[test]
fn test_swaps_land_on_block_boundaries() {
    fn world(value: f32) -> World {
        let mut world = World::new(2);
        world.add(Node::new(Constant::new(value, 2).unwrap())).unwrap();
        world
    }

    let engine = test_engine_with(2, 64);
    engine.swap_world(world(0.5)).unwrap();
    let puller = engine.puller().unwrap();
    let block_bytes = engine.bytes_per_block();
    engine.start().unwrap();

    let audio = thread::spawn(move || {
        let mut blocks = Vec::new();
        let mut out = vec![0u8; block_bytes];
        for _ in 0..200 {
            puller.pull(&mut out);
            blocks.push(decode_i16(&out));
            thread::yield_now();
        }
        blocks
    });

    let mut swaps = 0;
    for i in 0..50 {
        let value = if i % 2 == 0 { -0.5 } else { 0.5 };
        if engine.swap_world(world(value)).is_ok() {
            swaps += 1;
        }
        engine.collect_retired();
        thread::yield_now();
    }

    let blocks = audio.join().unwrap();
    assert!(swaps > 0);
    for block in blocks {
        let first = block[0];
        assert!(first == 16384 || first == -16384, "unexpected sample {}", first);
        assert!(block.iter().all(|&s| s == first), "torn block");
    }
}
