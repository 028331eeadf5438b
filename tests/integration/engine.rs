//! Engine lifecycle integration tests
//!
//! Tests engine creation, configuration, start/stop through the manual
//! backend, and deferred world swaps while running.

use arbor::prelude::*;

#[path = "../helpers/mod.rs"]
mod helpers;
use helpers::tolerances::*;
use helpers::*;

fn world_with(value: f32, outputs: usize) -> World {
    let mut world = World::new(outputs);
    world
        .add(
            Node::new(Constant::mono(value).unwrap())
                .with_channel_map(&[0])
                .unwrap(),
        )
        .unwrap();
    world
}

#[test]
fn test_engine_defaults() {
    let engine = ArborEngine::builder().build().unwrap();
    assert_eq!(engine.sample_rate(), 44100);
    assert_eq!(engine.block_size(), 512);
    assert_eq!(engine.num_outputs(), 2);
    assert_eq!(engine.bytes_per_block(), 512 * 2 * 2);
    assert_eq!(engine.backend_name(), "manual");
    assert!(engine.puller().is_some());
    assert!(!engine.is_running());
}

#[test]
fn test_engine_rejects_invalid_config() {
    assert!(ArborEngine::builder().block_size(0).build().is_err());
    assert!(ArborEngine::builder().outputs(0).build().is_err());
    assert!(ArborEngine::builder().sample_rate(100).build().is_err());
}

#[test]
fn test_start_stop_with_puller() {
    let engine = test_engine();
    engine.swap_world(world_with(0.5, 2)).unwrap();
    let puller = engine.puller().unwrap();
    let mut out = vec![0u8; engine.bytes_per_block()];

    assert_eq!(puller.pull(&mut out), 0);
    assert_silence(&decode(&out), 0.0);

    engine.start().unwrap();
    assert!(engine.is_running());
    assert_eq!(puller.pull(&mut out), engine.bytes_per_block());
    let left = channel(&decode(&out), 2, 0);
    assert_all_near(&left, 0.5, INT16_EPSILON);

    engine.stop().unwrap();
    assert!(!engine.is_running());
    assert_eq!(puller.pull(&mut out), 0);
}

#[test]
fn test_start_and_stop_are_idempotent() {
    let engine = test_engine();
    engine.start().unwrap();
    engine.start().unwrap();
    engine.stop().unwrap();
    engine.stop().unwrap();
    assert!(!engine.is_running());
}

#[test]
fn test_deferred_swap_while_running() {
    let engine = test_engine();
    engine.swap_world(world_with(0.5, 2)).unwrap();
    let puller = engine.puller().unwrap();
    engine.start().unwrap();

    let mut out = vec![0u8; engine.bytes_per_block()];
    puller.pull(&mut out);
    assert_eq!(decode_i16(&out)[0], 16384);

    engine.swap_world(world_with(-0.5, 2)).unwrap();
    assert!(engine.swap_pending());

    puller.pull(&mut out);
    assert!(!engine.swap_pending());
    assert_eq!(decode_i16(&out)[0], -16384);
    assert_eq!(engine.collect_retired(), 1);
}

#[test]
fn test_second_swap_before_pickup_is_rejected() {
    let engine = test_engine();
    engine.start().unwrap();
    engine.swap_world(world_with(0.1, 2)).unwrap();
    let err = engine.swap_world(world_with(0.2, 2)).unwrap_err();
    assert!(matches!(
        err,
        arbor::Error::Core(arbor::core::Error::CommitPending)
    ));
}

#[test]
fn test_swap_rejects_output_mismatch() {
    let engine = test_engine();
    assert!(engine.swap_world(world_with(0.5, 4)).is_err());
    engine.start().unwrap();
    assert!(engine.swap_world(world_with(0.5, 4)).is_err());
    assert!(!engine.swap_pending());
}

#[test]
fn test_swap_rejects_invalid_tree_before_handoff() {
    let engine = test_engine();
    engine.start().unwrap();

    let mut world = World::new(2);
    let mut source = Node::new(Constant::new(0.5, 2).unwrap());
    source.add_child(Node::new(Gain::new(2).unwrap())).unwrap();
    let handle = source.handle();
    world.add(source).unwrap();
    // The gain insert still expects two channels.
    handle.set_num_outputs(1).unwrap();

    assert!(engine.swap_world(world).is_err());
    assert!(!engine.swap_pending());
}

#[test]
fn test_restart_keeps_graph() {
    let engine = test_engine();
    engine.swap_world(world_with(1.0, 2)).unwrap();
    let puller = engine.puller().unwrap();
    let mut out = vec![0u8; engine.bytes_per_block()];

    engine.start().unwrap();
    engine.stop().unwrap();
    engine.start().unwrap();
    puller.pull(&mut out);
    assert_eq!(decode_i16(&out)[0], 32767);
}

#[test]
fn test_render_blocks_offline() {
    let engine = test_engine();
    engine.swap_world(world_with(0.25, 2)).unwrap();

    let pcm = engine.render_blocks(3).unwrap();
    assert_eq!(pcm.len(), 3 * engine.bytes_per_block());

    let samples = decode(&pcm);
    assert_all_near(&channel(&samples, 2, 0), 0.25, INT16_EPSILON);
    assert_silence(&channel(&samples, 2, 1), 0.0);
}

#[test]
fn test_graph_refused_while_running() {
    let engine = test_engine();
    engine.start().unwrap();
    assert!(engine.graph(|_| ()).is_err());
    assert!(engine.render_blocks(1).is_err());
}

#[test]
fn test_commit_left_pending_at_stop_is_kept() {
    let engine = test_engine();
    engine.start().unwrap();
    engine.swap_world(world_with(-0.5, 2)).unwrap();
    engine.stop().unwrap();
    assert!(!engine.swap_pending());

    let samples = decode_i16(&engine.render_blocks(1).unwrap());
    assert_eq!(samples[0], -16384);
}

#[test]
fn test_stopped_swap_wins_over_earlier_commit() {
    let engine = test_engine();
    let puller = engine.puller().unwrap();
    let mut out = vec![0u8; engine.bytes_per_block()];

    engine.start().unwrap();
    engine.swap_world(world_with(-0.5, 2)).unwrap();
    engine.stop().unwrap();

    let latest = world_with(0.5, 2);
    let latest_id = latest.handles()[0].id();
    engine.swap_world(latest).unwrap();
    engine.start().unwrap();
    puller.pull(&mut out);

    assert_eq!(decode_i16(&out)[0], 16384);
    assert_eq!(engine.handles().len(), 1);
    assert_eq!(engine.handles()[0].id(), latest_id);
    assert!(!engine.swap_pending());
}

#[test]
fn test_handles_track_audible_world_after_stop() {
    let engine = test_engine();
    engine.start().unwrap();
    engine.swap_world(world_with(0.5, 2)).unwrap();
    engine.stop().unwrap();

    // Muting through the engine's handle silences what actually plays.
    engine.handles()[0].set_mute(true);
    assert_silence(&decode(&engine.render_blocks(1).unwrap()), 0.0);
}
