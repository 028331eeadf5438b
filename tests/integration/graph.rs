//! Node tree integration tests
//!
//! Tests chain and bus construction, channel maps, topology errors and how
//! levels, mutes and activity flow into the master bus.

use arbor::core::TopologyError;
use arbor::prelude::*;

#[path = "../helpers/mod.rs"]
mod helpers;
use helpers::tolerances::*;
use helpers::*;

fn mono(value: f32, channel: usize) -> Node {
    Node::new(Constant::mono(value).unwrap())
        .with_channel_map(&[channel])
        .unwrap()
}

#[test]
fn test_node_ids_are_unique() {
    let a = Node::new(Constant::mono(0.0).unwrap());
    let b = Node::new(Constant::mono(0.0).unwrap());
    assert_ne!(a.id(), b.id());
}

#[test]
fn test_chain_follows_tail_width() {
    let mut source = Node::new(Constant::new(0.5, 2).unwrap());
    assert_eq!(source.effective_outputs(), 2);
    source.add_child(Node::new(Gain::new(2).unwrap())).unwrap();
    source.add_child(Node::new(Sharpen::new(2).unwrap())).unwrap();
    assert_eq!(source.handle().max_outputs(), 2);
    assert_eq!(source.handle().channel_map(), vec![0, 1]);
}

#[test]
fn test_chain_rejects_width_mismatch() {
    let mut source = Node::new(Constant::mono(0.5).unwrap());
    let err = source
        .add_child(Node::new(Gain::new(2).unwrap()))
        .unwrap_err();
    assert_eq!(
        err,
        TopologyError::ChainMismatch {
            position: 0,
            expected: 1,
            found: 2
        }
    );
    assert!(source.children().is_empty());
}

#[test]
fn test_bus_rejects_out_of_range_map() {
    let mut bus = Node::new(Passthrough::stereo());
    let err = bus.add_child(mono(1.0, 2)).unwrap_err();
    assert!(matches!(
        err,
        TopologyError::ChannelOutOfRange { channel: 2, .. }
    ));
}

#[test]
fn test_attached_map_is_checked_against_parent() {
    let mut bus = Node::new(Passthrough::stereo());
    let child = bus.add_child(mono(1.0, 0)).unwrap();
    assert!(child.set_channel_map(&[1]).is_ok());
    assert!(child.set_channel_map(&[2]).is_err());
    assert!(child.set_channel_map(&[0, 1]).is_err());
    assert_eq!(child.channel_map(), vec![1]);
}

#[test]
fn test_channel_counts_lock_after_initialize() {
    let engine = test_engine();
    let handle = engine
        .graph(|w| w.add(Node::new(Passthrough::stereo())))
        .unwrap()
        .unwrap();
    assert!(handle.set_num_inputs(3).is_ok());
    handle.set_num_inputs(2).unwrap();

    engine.render_blocks(1).unwrap();
    assert!(handle.is_initialized());
    assert_eq!(
        handle.set_num_inputs(4),
        Err(TopologyError::ChannelCountLocked)
    );
}

#[test]
fn test_nested_buses_mix_down() {
    let engine = test_engine();
    engine
        .graph(|w| {
            let mut inner = Node::new(Passthrough::new(1, 1).unwrap());
            inner.add_child(mono(0.25, 0))?;
            inner.add_child(mono(0.25, 0))?;

            let mut outer = Node::new(Passthrough::stereo());
            outer.add_child(inner.with_channel_map(&[1]).unwrap())?;
            outer.add_child(mono(0.125, 0))?;
            w.add(outer)
        })
        .unwrap()
        .unwrap();

    let samples = decode(&engine.render_blocks(1).unwrap());
    assert_all_near(&channel(&samples, 2, 0), 0.125, INT16_EPSILON);
    assert_all_near(&channel(&samples, 2, 1), 0.5, INT16_EPSILON);
}

#[test]
fn test_many_to_one_map_sums() {
    let engine = test_engine();
    engine
        .graph(|w| {
            let stereo = Node::new(Constant::new(0.25, 2).unwrap())
                .with_channel_map(&[0, 0])
                .unwrap();
            w.add(stereo)
        })
        .unwrap()
        .unwrap();

    let samples = decode(&engine.render_blocks(1).unwrap());
    assert_all_near(&channel(&samples, 2, 0), 0.5, INT16_EPSILON);
    assert_silence(&channel(&samples, 2, 1), 0.0);
}

#[test]
fn test_muted_and_inactive_children_are_skipped() {
    let engine = test_engine();
    let (muted, inactive) = engine
        .graph(|w| {
            let mut bus = Node::new(Passthrough::stereo());
            bus.add_child(mono(0.25, 0))?;
            let muted = bus.add_child(mono(0.5, 0))?;
            let inactive = bus.add_child(mono(0.5, 1))?;
            w.add(bus)?;
            Ok::<_, TopologyError>((muted, inactive))
        })
        .unwrap()
        .unwrap();

    muted.set_mute(true);
    inactive.set_active(false);

    let samples = decode(&engine.render_blocks(2).unwrap());
    assert_all_near(&channel(&samples, 2, 0), 0.25, INT16_EPSILON);
    assert_silence(&channel(&samples, 2, 1), 0.0);
}

#[test]
fn test_inactive_insert_is_bypassed() {
    let engine = test_engine();
    let insert = engine
        .graph(|w| {
            let mut source = Node::new(Constant::mono(0.5).unwrap());
            let insert = source.add_child(Node::new(Gain::new(1).unwrap()))?;
            insert.set_parameter("gain", ParamValue::Float(0.5)).unwrap();
            w.add(source)?;
            Ok::<_, TopologyError>(insert)
        })
        .unwrap()
        .unwrap();

    let processed = decode(&engine.render_blocks(1).unwrap());
    assert_all_near(&channel(&processed, 2, 0), 0.25, INT16_EPSILON);

    insert.set_active(false);
    let bypassed = decode(&engine.render_blocks(1).unwrap());
    assert_all_near(&channel(&bypassed, 2, 0), 0.5, INT16_EPSILON);
}

#[test]
fn test_muted_insert_silences_chain() {
    let engine = test_engine();
    let insert = engine
        .graph(|w| {
            let mut source = Node::new(Constant::mono(0.5).unwrap());
            let insert = source.add_child(Node::new(Gain::new(1).unwrap()))?;
            w.add(source)?;
            Ok::<_, TopologyError>(insert)
        })
        .unwrap()
        .unwrap();

    insert.set_mute(true);
    assert_silence(&decode(&engine.render_blocks(1).unwrap()), 0.0);
}

#[test]
fn test_remove_child_restores_source_width() {
    let mut source = Node::new(Constant::mono(0.5).unwrap());
    let up = Node::new(Passthrough::new(1, 2).unwrap());
    let id = up.id();
    // A passthrough in a chain is fed directly by its upstream node.
    source.add_child(up).unwrap();
    assert_eq!(source.effective_outputs(), 2);

    assert!(source.remove_child(id).is_some());
    assert_eq!(source.effective_outputs(), 1);
    assert_eq!(source.handle().channel_map(), vec![0]);
}
