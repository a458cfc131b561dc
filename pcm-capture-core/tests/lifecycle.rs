//! End-to-end lifecycle scenarios against the in-memory device.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use approx::assert_relative_eq;
use pcm_capture_core::processing::pcm;
use pcm_capture_core::{
    AudioEngine, AudioInputController, ByteOrder, FormatDescriptor, InputBuffers, LifecycleState,
    MemoryInputDevice,
};

const DEADLINE: Duration = Duration::from_secs(5);

fn wait_for_sequence(buffers: &InputBuffers, sequence: u64) -> bool {
    let start = Instant::now();
    while start.elapsed() < DEADLINE {
        if buffers.sequence() >= sequence {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    false
}

/// One stereo chunk with constant left/right values.
fn stereo_chunk(frames: usize, left: i16, right: i16, order: ByteOrder) -> Vec<u8> {
    let mut raw = Vec::with_capacity(frames * 4);
    for _ in 0..frames {
        pcm::extend_from_i16(&mut raw, &[left, right], order);
    }
    raw
}

#[test]
fn zero_chunk_scenario() {
    let device = MemoryInputDevice::new("memory");
    let format = FormatDescriptor::new(44100.0, 2, ByteOrder::Little);
    let mut controller = AudioInputController::with_format(device.clone(), format).unwrap();
    assert_eq!(controller.format().chunk_size_bytes(), 2048);

    controller.open().unwrap();
    controller.start().unwrap();
    assert!(device.push(&[0u8; 2048]));

    let buffers = controller.buffers();
    assert!(wait_for_sequence(&buffers, 1));
    controller.close().unwrap();

    let frame = buffers.snapshot();
    for buffer in [&frame.left, &frame.right, &frame.mix] {
        assert_eq!(buffer.samples(), &[0.0f32; 512][..]);
    }
}

#[test]
fn big_endian_device_stream() {
    let device = MemoryInputDevice::new("memory");
    let format = FormatDescriptor::new(48000.0, 2, ByteOrder::Big).with_buffer_length(8);
    let mut controller = AudioInputController::with_format(device.clone(), format).unwrap();
    controller.open().unwrap();
    controller.start().unwrap();

    device.push(&stereo_chunk(8, 8192, -24576, ByteOrder::Big));

    let buffers = controller.buffers();
    assert!(wait_for_sequence(&buffers, 1));
    let frame = buffers.snapshot();
    assert_eq!(frame.left.samples(), &[0.25f32; 8][..]);
    assert_eq!(frame.right.samples(), &[-0.75f32; 8][..]);
    assert_eq!(frame.mix.samples(), &[-0.25f32; 8][..]);
}

#[test]
fn no_writes_after_close() {
    let device = MemoryInputDevice::new("memory");
    let format = FormatDescriptor::stereo(44100.0).with_buffer_length(16);
    let mut controller = AudioInputController::with_format(device.clone(), format).unwrap();
    controller.open().unwrap();
    controller.start().unwrap();

    let feeding = Arc::new(AtomicBool::new(true));
    let feeder = {
        let device = device.clone();
        let feeding = Arc::clone(&feeding);
        thread::spawn(move || {
            let mut value: i16 = 0;
            while feeding.load(Ordering::SeqCst) {
                value = value.wrapping_add(97);
                device.push(&stereo_chunk(16, value, -value, ByteOrder::Little));
                thread::sleep(Duration::from_millis(1));
            }
        })
    };

    let buffers = controller.buffers();
    assert!(wait_for_sequence(&buffers, 5));
    controller.close().unwrap();

    let before = buffers.snapshot();
    thread::sleep(Duration::from_millis(100));
    let after = buffers.snapshot();

    feeding.store(false, Ordering::SeqCst);
    feeder.join().unwrap();

    assert_eq!(before, after);
    assert_eq!(controller.state(), LifecycleState::Closed);
}

#[test]
fn stop_then_start_resumes_without_loss() {
    let device = MemoryInputDevice::new("memory");
    let format = FormatDescriptor::stereo(44100.0).with_buffer_length(4);
    let mut controller = AudioInputController::with_format(device.clone(), format).unwrap();
    let buffers = controller.buffers();
    controller.open().unwrap();
    controller.start().unwrap();

    device.push(&stereo_chunk(4, 16384, 16384, ByteOrder::Little));
    assert!(wait_for_sequence(&buffers, 1));

    controller.stop().unwrap();
    assert_eq!(controller.state(), LifecycleState::OpenStopped);
    device.push(&stereo_chunk(4, -8192, 8192, ByteOrder::Little));

    controller.start().unwrap();
    assert!(wait_for_sequence(&buffers, 2));

    let frame = buffers.snapshot();
    assert_eq!(frame.sequence, 2);
    assert_eq!(frame.left.samples(), &[-0.25f32; 4][..]);
    assert_eq!(frame.right.samples(), &[0.25f32; 4][..]);
    assert_eq!(device.line().unwrap().queued(), 0);
}

#[test]
fn swapped_input_feeds_meter() {
    let format = FormatDescriptor::stereo(44100.0).with_buffer_length(4);
    let old_device = MemoryInputDevice::new("old");
    let new_device = MemoryInputDevice::new("new");
    let mut engine =
        AudioEngine::new(AudioInputController::with_format(old_device.clone(), format).unwrap());
    engine.set_enabled(true).unwrap();

    old_device.push(&stereo_chunk(4, 16384, 16384, ByteOrder::Little));
    assert!(wait_for_sequence(&engine.input().buffers(), 1));
    assert_relative_eq!(engine.meter().poll().unwrap().mix_level, 0.5);

    let previous = engine
        .change_input(AudioInputController::with_format(new_device.clone(), format).unwrap())
        .unwrap();
    let old_sequence = previous.buffers().sequence();

    assert!(!old_device.push(&stereo_chunk(4, 32767, 32767, ByteOrder::Little)));
    new_device.push(&stereo_chunk(4, 8192, 8192, ByteOrder::Little));
    assert!(wait_for_sequence(&engine.input().buffers(), 1));

    let levels = engine.meter().poll().unwrap();
    assert_relative_eq!(levels.mix_level, 0.25);
    assert_eq!(previous.buffers().sequence(), old_sequence);
}

#[test]
fn engine_survives_device_disconnect() {
    let device = MemoryInputDevice::new("memory");
    let format = FormatDescriptor::stereo(44100.0).with_buffer_length(4);
    let mut engine = AudioEngine::new(AudioInputController::with_format(device.clone(), format).unwrap());
    engine.set_enabled(true).unwrap();

    device.disconnect();
    let start = Instant::now();
    while engine.input().state() != LifecycleState::Closed && start.elapsed() < DEADLINE {
        thread::sleep(Duration::from_millis(2));
    }
    assert_eq!(engine.input().state(), LifecycleState::Closed);

    engine.set_enabled(true).unwrap();
    assert_eq!(engine.input().state(), LifecycleState::OpenRunning);
    assert_eq!(device.open_count(), 2);
}
