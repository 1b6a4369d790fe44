//! Commands and observer fan-out through the control plane.

mod common;

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use common::{LevelSensor, PulseSensor, SpyActuator, controller, step};
use crossbeam_channel::{Receiver, bounded, unbounded};
use shot_core::{
    ControlLoop, ControlPlane, ControllerStatus, Dialect, Inbound, Phase, ShotBudget,
};
use shot_traits::ManualClock;

fn observer(plane: &mut ControlPlane, id: u64) -> Receiver<String> {
    let (tx, rx) = unbounded::<String>();
    plane.connect(id, Box::new(tx));
    rx
}

fn frames(rx: &Receiver<String>) -> Vec<ControllerStatus> {
    rx.try_iter()
        .map(|f| serde_json::from_str(&f).unwrap())
        .collect()
}

#[test]
fn status_is_unicast_to_the_requester() {
    let clock = ManualClock::new();
    let mut ctl = controller(LevelSensor::new(1.0), SpyActuator::new(&clock), &clock, ShotBudget::Remaining(2), 250.0);
    let mut plane = ControlPlane::new(Dialect::Strict);
    let a = observer(&mut plane, 1);
    let b = observer(&mut plane, 2);

    plane.handle_message(1, "status", &mut ctl);

    let got = frames(&a);
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].number_of_shots, 2);
    assert_eq!(got[0].delay_between_shots, 250.0);
    assert!(frames(&b).is_empty());
    assert_eq!(plane.broadcasts(), 0);
}

#[test]
fn commands_broadcast_to_every_observer() {
    let clock = ManualClock::new();
    let mut ctl = controller(LevelSensor::new(1.0), SpyActuator::new(&clock), &clock, ShotBudget::Remaining(2), 0.0);
    let mut plane = ControlPlane::new(Dialect::Strict);
    let a = observer(&mut plane, 1);
    let b = observer(&mut plane, 2);

    plane.handle_message(2, "on", &mut ctl);
    assert_eq!(ctl.phase(), Phase::Starting);
    plane.handle_message(1, "off", &mut ctl);
    assert_eq!(ctl.phase(), Phase::Idle);

    assert_eq!(frames(&a).len(), 2);
    assert_eq!(frames(&b).len(), 2);
}

#[test]
fn patch_applies_every_field_and_broadcasts_once() {
    let clock = ManualClock::new();
    let mut ctl = controller(LevelSensor::new(1.0), SpyActuator::new(&clock), &clock, ShotBudget::Remaining(0), 0.0);
    let mut plane = ControlPlane::new(Dialect::Strict);
    let a = observer(&mut plane, 1);

    plane.handle_message(
        1,
        r#"{"numberOfShots":5,"delayBetweenShots":120.5,"state":"start"}"#,
        &mut ctl,
    );

    assert_eq!(ctl.params().shots, ShotBudget::Remaining(5));
    assert_eq!(ctl.params().inter_shot_delay_ms, 120.5);
    assert_eq!(ctl.phase(), Phase::Starting);
    let got = frames(&a);
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].number_of_shots, 5);
}

#[test]
fn invalid_patch_fields_leave_parameters_alone() {
    let clock = ManualClock::new();
    let mut ctl = controller(LevelSensor::new(1.0), SpyActuator::new(&clock), &clock, ShotBudget::Remaining(2), 80.0);
    let mut plane = ControlPlane::new(Dialect::Strict);

    plane.handle_message(
        1,
        r#"{"numberOfShots":-7,"delayBetweenShots":-1,"state":"warp"}"#,
        &mut ctl,
    );

    assert_eq!(ctl.params().shots, ShotBudget::Remaining(2));
    assert_eq!(ctl.params().inter_shot_delay_ms, 80.0);
    assert_eq!(ctl.phase(), Phase::Idle);
}

#[test]
fn unknown_text_is_ignored_in_strict_mode() {
    let clock = ManualClock::new();
    let mut ctl = controller(LevelSensor::new(1.0), SpyActuator::new(&clock), &clock, ShotBudget::Remaining(1), 0.0);
    let mut plane = ControlPlane::new(Dialect::Strict);
    let a = observer(&mut plane, 1);

    plane.handle_message(1, "turn it on please", &mut ctl);

    assert_eq!(ctl.phase(), Phase::Idle);
    assert!(frames(&a).is_empty());
}

#[test]
fn legacy_dialect_matches_substrings() {
    let clock = ManualClock::new();
    let mut ctl = controller(LevelSensor::new(1.0), SpyActuator::new(&clock), &clock, ShotBudget::Remaining(1), 0.0);
    let mut plane = ControlPlane::new(Dialect::Legacy);
    let a = observer(&mut plane, 1);

    plane.handle_message(1, "button on", &mut ctl);

    assert_eq!(ctl.phase(), Phase::Starting);
    assert_eq!(frames(&a).len(), 1);
}

#[test]
fn single_shot_fires_once_then_idles() {
    let clock = ManualClock::new();
    let act = SpyActuator::new(&clock);
    let sensor = PulseSensor::following(&act);
    let mut ctl = controller(sensor, act.clone(), &clock, ShotBudget::Unlimited, 0.0);
    let mut plane = ControlPlane::new(Dialect::Strict);

    plane.handle_message(1, "os", &mut ctl);
    common::run_to_idle(&mut ctl, &mut plane, 20_000);

    assert_eq!(act.enables().len(), 1);
    assert_eq!(ctl.params().shots, ShotBudget::Remaining(0));
}

#[test]
fn dropped_observers_are_pruned_on_broadcast() {
    let clock = ManualClock::new();
    let mut ctl = controller(LevelSensor::new(1.0), SpyActuator::new(&clock), &clock, ShotBudget::Remaining(1), 0.0);
    let mut plane = ControlPlane::new(Dialect::Strict);
    let a = observer(&mut plane, 1);
    let b = observer(&mut plane, 2);
    drop(b);

    plane.handle_message(1, "on", &mut ctl);

    assert_eq!(plane.observer_count(), 1);
    assert_eq!(frames(&a).len(), 1);
}

#[test]
fn stalled_observers_are_pruned_when_their_queue_is_full() {
    let clock = ManualClock::new();
    let mut ctl = controller(LevelSensor::new(1.0), SpyActuator::new(&clock), &clock, ShotBudget::Unlimited, 0.0);
    let mut plane = ControlPlane::new(Dialect::Strict);
    let live = observer(&mut plane, 1);
    let (tx, stalled) = bounded::<String>(2);
    plane.connect(2, Box::new(tx));

    plane.handle_message(1, "on", &mut ctl);
    plane.handle_message(1, "off", &mut ctl);
    assert_eq!(plane.observer_count(), 2);

    plane.handle_message(1, "on", &mut ctl);
    assert_eq!(plane.observer_count(), 1);
    assert_eq!(frames(&live).len(), 3);
    assert_eq!(stalled.len(), 2);
}

#[test]
fn end_to_end_three_shots_half_a_second_apart() {
    let clock = ManualClock::new();
    let act = SpyActuator::new(&clock);
    let sensor = PulseSensor::following(&act);
    let mut ctl = controller(sensor, act.clone(), &clock, ShotBudget::Remaining(0), 0.0);
    let mut plane = ControlPlane::new(Dialect::Strict);
    let a = observer(&mut plane, 1);

    plane.handle_message(1, r#"{"numberOfShots":3,"delayBetweenShots":500}"#, &mut ctl);
    plane.handle_message(1, "on", &mut ctl);
    let mut ticks = 0;
    loop {
        ticks += 1;
        assert!(ticks < 20_000, "sequence did not finish");
        if step(&mut ctl, &mut plane) == Phase::Idle {
            break;
        }
    }

    let on = act.enables();
    let off = act.disables();
    assert_eq!(on.len(), 3);
    assert_eq!(off.len(), 3);
    for i in 0..2 {
        assert!(on[i + 1] - off[i] >= Duration::from_millis(500));
    }
    assert_eq!(ctl.status().number_of_shots, 0);
    let last = frames(&a).pop().unwrap();
    assert_eq!(last.number_of_shots, 0);
    assert!(!last.is_motor_enabled);
}

#[test]
fn loop_applies_commands_before_the_next_tick() {
    let clock = ManualClock::new();
    let act = SpyActuator::new(&clock);
    let ctl = controller(LevelSensor::new(100.0), act.clone(), &clock, ShotBudget::Remaining(1), 0.0);
    let (tx, rx) = unbounded();
    let shutdown = Arc::new(AtomicBool::new(false));
    let mut lp = ControlLoop::new(ctl, ControlPlane::new(Dialect::Strict), rx, shutdown);

    let (obs_tx, obs_rx) = unbounded::<String>();
    tx.send(Inbound::Connected { id: 7, observer: Box::new(obs_tx) }).unwrap();
    assert_eq!(lp.step().unwrap(), Phase::Idle);
    assert_eq!(lp.plane().observer_count(), 1);

    tx.send(Inbound::Message { id: 7, text: "on".into() }).unwrap();
    assert_eq!(lp.step().unwrap(), Phase::Actuating);
    assert!(act.switches().len() == 1);
    // one for the command, one for the enable
    assert_eq!(frames(&obs_rx).len(), 2);

    tx.send(Inbound::Disconnected { id: 7 }).unwrap();
    lp.step().unwrap();
    assert_eq!(lp.plane().observer_count(), 0);
    assert_eq!(lp.ticks(), 3);
}

#[test]
fn loop_halts_the_actuator_on_shutdown() {
    let clock = ManualClock::new();
    let act = SpyActuator::new(&clock);
    let mut ctl = controller(LevelSensor::new(100.0), act.clone(), &clock, ShotBudget::Remaining(1), 0.0);
    ctl.start();
    let (_tx, rx) = unbounded();
    let shutdown = Arc::new(AtomicBool::new(false));
    let mut lp = ControlLoop::new(ctl, ControlPlane::new(Dialect::Strict), rx, Arc::clone(&shutdown));

    lp.step().unwrap();
    assert!(lp.controller().is_actuator_enabled());

    shutdown.store(true, std::sync::atomic::Ordering::Relaxed);
    let summary = lp.run().unwrap();

    assert_eq!(summary.ticks, 1);
    assert_eq!(summary.shots_fired, 1);
    assert_eq!(act.disables().len(), 1);
}

#[test]
fn loop_stops_on_actuator_failure() {
    let clock = ManualClock::new();
    let act = SpyActuator::failing(&clock);
    let mut ctl = controller(LevelSensor::new(100.0), act, &clock, ShotBudget::Remaining(1), 0.0);
    ctl.start();
    let (_tx, rx) = unbounded();
    let lp = ControlLoop::new(ctl, ControlPlane::new(Dialect::Strict), rx, Arc::new(AtomicBool::new(false)));

    assert!(lp.run().is_err());
}
