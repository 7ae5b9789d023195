use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;

use gamepals_arbitrator::*;
use gamepals_core::*;

const CONFIG: &str = r#"{
    "policies": {
        "THROTTLE": "POLICY_CONT_OR",
        "JUMP": "POLICY_EXCLUSIVITY",
        "FIRE": "POLICY_BIN_SUPV_BY_PILOT"
    },
    "game_inputs": {
        "THROTTLE": ["TRIGGER_RIGHT"],
        "JUMP": ["BTN_A"],
        "FIRE": ["BTN_X"],
        "STEER": ["STICK_LEFT_X_POS", "STICK_LEFT_X_NEG"]
    },
    "humans": {
        "0": {
            "actions": {
                "STEER": {
                    "confidence": 0.4,
                    "controls": ["STICK_LEFT_X_POS", "STICK_LEFT_X_NEG"]
                }
            }
        }
    },
    "agents": {
        "pilot": { "actions": { "FIRE": "Pilot" } },
        "helper": { "actions": { "FIRE": "Copilot" } }
    },
    "shards": 4
}"#;

struct Rig {
    cfg: Arc<ArbitrationCfg>,
    pad: Arc<VirtualGamepad>,
    arb: Arc<CommandArbitrator>,
}

fn rig(text: &str) -> Rig {
    let cfg = Arc::new(ArbitrationCfg::from_json(text).unwrap());
    let conversion = Arc::new(ActionConversionManager::new(cfg.clone(), Vec::new()));
    let pad = Arc::new(VirtualGamepad::new());
    let arb = CommandArbitrator::new(cfg.clone(), conversion, pad.clone());
    Rig { cfg, pad, arb }
}

fn external(name: &str, actions: &[&str]) -> Arc<ExternalActor> {
    Arc::new(ExternalActor::new(
        name,
        actions.iter().map(|a| GameAction::from(*a)).collect(),
    ))
}

fn act(s: &str) -> GameAction {
    GameAction::from(s)
}

#[test]
fn most_recent_update_drives_the_trigger() {
    let r = rig(CONFIG);
    let a = external("a", &["THROTTLE"]);
    let b = external("b", &["THROTTLE"]);
    r.arb.add_actor(a.clone()).unwrap();
    r.arb.add_actor(b.clone()).unwrap();
    r.arb.start();

    a.push(ActionInput::new("THROTTLE", 0.3), 1.0);
    sleep(Duration::from_millis(2));
    b.push(ActionInput::new("THROTTLE", 0.8), 1.0);
    assert_eq!(r.pad.last_value(InputType::TriggerRight), Some(0.8));

    sleep(Duration::from_millis(2));
    a.push(ActionInput::new("THROTTLE", 0.5), 1.0);
    assert_eq!(r.pad.last_value(InputType::TriggerRight), Some(0.5));
    assert_eq!(r.pad.state().right_trigger, 0.5);
    assert_eq!(r.arb.merged_value(&act("THROTTLE")), 0.5);
}

#[test]
fn arbitrate_returns_what_was_actuated() {
    let r = rig(CONFIG);
    let a = external("a", &["STEER"]);
    r.arb.add_actor(a.clone()).unwrap();

    let out = r
        .arb
        .arbitrate(a.id(), ActionInputWithConfidence::new("STEER", -0.6, 1.0));
    assert_eq!(out, vec![ControllerInput::new(InputType::StickLeftXNeg, -0.6)]);
    assert_eq!(r.pad.state().left_stick, (-0.6, 0.0));
}

#[test]
fn exclusivity_roster_overflow_is_fatal() {
    let r = rig(CONFIG);
    r.arb.add_actor(external("first", &["JUMP"])).unwrap();

    let second = external("second", &["THROTTLE", "JUMP"]);
    let err = r.arb.add_actor(second.clone()).unwrap_err();
    assert_eq!(
        err,
        ArbitrationError::RosterFull {
            action: act("JUMP"),
            policy: PolicyKind::Exclusivity,
            max_actors: 1,
        }
    );

    // Nothing of the failed registration is left behind.
    let throttle = r.arb.policies().policy_for(&act("THROTTLE"));
    assert!(!throttle.actors.contains_key(&second.id()));
    assert_eq!(r.arb.actor_ids().len(), 1);
}

#[test]
fn updates_outside_the_roster_are_dropped() {
    let r = rig(CONFIG);
    let a = external("a", &["THROTTLE"]);
    r.arb.add_actor(a.clone()).unwrap();
    r.arb.start();

    let out = r
        .arb
        .arbitrate(a.id(), ActionInputWithConfidence::new("JUMP", 1.0, 1.0));
    assert!(out.is_empty());

    let out = r
        .arb
        .arbitrate(ActorId::new(), ActionInputWithConfidence::new("THROTTLE", 1.0, 1.0));
    assert!(out.is_empty());

    assert!(r.pad.history().is_empty());
    assert!(a.take_feedback().is_empty());
}

#[test]
fn roster_is_frozen_after_start() {
    let r = rig(CONFIG);
    r.arb.add_actor(external("a", &["THROTTLE"])).unwrap();
    r.arb.start();
    r.arb.start();
    assert!(r.pad.is_started());

    let err = r.arb.add_actor(external("late", &["THROTTLE"])).unwrap_err();
    assert_eq!(err, ArbitrationError::AlreadyStarted);
}

#[test]
fn reset_message_releases_controls() {
    let r = rig(CONFIG);
    let a = external("a", &["JUMP"]);
    r.arb.add_actor(a.clone()).unwrap();
    r.arb.start();

    a.push(ActionInput::new("JUMP", 1.0), 1.0);
    assert!(r.pad.state().is_pressed(InputType::BtnA));

    a.push_message("hello");
    assert_eq!(r.pad.reset_count(), 0);

    a.push_message("RESET");
    assert_eq!(r.pad.reset_count(), 1);
    assert_eq!(r.pad.state(), GamepadState::default());
}

#[test]
fn every_actor_sees_the_final_command() {
    let r = rig(CONFIG);
    let a = external("a", &["THROTTLE"]);
    let b = external("b", &["JUMP"]);
    r.arb.add_actor(a.clone()).unwrap();
    r.arb.add_actor(b.clone()).unwrap();
    r.arb.start();

    a.push(ActionInput::new("THROTTLE", 0.7), 1.0);

    let expected = vec![ControllerInput::new(InputType::TriggerRight, 0.7)];
    assert_eq!(a.take_feedback(), expected);
    assert_eq!(b.take_feedback(), expected);
}

#[test]
fn pilot_overrides_confident_copilot() {
    let r = rig(CONFIG);
    let pilot = external("pilot", &["FIRE"]);
    let helper = external("helper", &["FIRE"]);
    r.arb.add_actor(pilot.clone()).unwrap();
    r.arb.add_actor(helper.clone()).unwrap();
    r.arb.start();

    let roster = r.arb.policies().policy_for(&act("FIRE"));
    assert_eq!(roster.policy, PolicyKind::SupervisionByPilot);
    assert_eq!(roster.actors.get(&pilot.id()), Some(&PolicyRole::Pilot));
    assert_eq!(roster.actors.get(&helper.id()), Some(&PolicyRole::Copilot));

    helper.push(ActionInput::new("FIRE", 0.0), 1.0);
    assert!(!r.pad.state().is_pressed(InputType::BtnX));

    pilot.push(ActionInput::new("FIRE", 1.0), 0.1);
    assert!(r.pad.state().is_pressed(InputType::BtnX));
}

#[test]
fn unseen_actions_get_the_default_policy() {
    let r = rig(r#"{ "default_policy": "POLICY_CONT_SUM" }"#);
    let entry = r.arb.policies().policy_for(&act("HORN"));
    assert_eq!(entry.policy, PolicyKind::ContinuousSum);
    assert!(entry.actors.is_empty());
    assert_eq!(r.arb.merged_value(&act("HORN")), 0.0);
}

#[test]
fn human_start_announces_confidence() {
    let r = rig(CONFIG);
    let human = Arc::new(HumanActor::new(&r.cfg, 0, r.arb.conversion().clone()));
    r.arb.add_actor(human.clone()).unwrap();
    r.arb.start();

    let snap = r.arb.snapshot();
    assert_eq!(snap.actors.len(), 1);
    let records = &snap.actors[0].records;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].action, act("STEER"));
    assert_eq!(records[0].value, 0.0);
    assert_eq!(records[0].confidence, 0.4);
    assert!(records[0].age_ms.is_some());
}

#[test]
fn snapshot_is_sorted_and_serializable() {
    // JUMP is exclusive in the shared config; open it up for five actors.
    let r = rig(&CONFIG.replace("POLICY_EXCLUSIVITY", "POLICY_BIN_OR"));
    let actors: Vec<Arc<ExternalActor>> = (0..5)
        .map(|i| external(&format!("x{i}"), &["THROTTLE", "JUMP", "STEER"]))
        .collect();
    for a in &actors {
        r.arb.add_actor(a.clone()).unwrap();
    }
    r.arb.start();

    actors[3].push(ActionInput::new("THROTTLE", 0.9), 0.5);
    actors[1].push(ActionInput::new("STEER", 0.2), 1.0);

    let snap = r.arb.snapshot();
    let ids: Vec<ActorId> = snap.actors.iter().map(|a| a.actor_id).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);

    for a in &snap.actors {
        let names: Vec<&str> = a.records.iter().map(|r| r.action.as_str()).collect();
        let mut sorted_names = names.clone();
        sorted_names.sort();
        assert_eq!(names, sorted_names);
    }

    // Actors that never wrote THROTTLE hold a default record after the merge.
    let idle = snap
        .actors
        .iter()
        .find(|a| a.actor_id == actors[0].id())
        .unwrap();
    let throttle = idle
        .records
        .iter()
        .find(|r| r.action == act("THROTTLE"))
        .unwrap();
    assert_eq!(throttle.age_ms, None);
    assert_eq!(throttle.confidence, 0.0);

    let json = serde_json::to_value(&snap).unwrap();
    assert_eq!(json["actors"].as_array().map(|a| a.len()), Some(5));
}

#[test]
fn back_to_back_updates_need_no_clock_gap() {
    let r = rig(CONFIG);
    let a = external("a", &["THROTTLE"]);
    let b = external("b", &["THROTTLE"]);
    r.arb.add_actor(a.clone()).unwrap();
    r.arb.add_actor(b.clone()).unwrap();
    r.arb.start();

    // No sleeps: consecutive writes may share a clock reading.
    for n in 0..1000 {
        let v = (n % 10) as f32 / 10.0;
        let who = if n % 2 == 0 { &a } else { &b };
        who.push(ActionInput::new("THROTTLE", v), 1.0);
        assert_eq!(r.pad.last_value(InputType::TriggerRight), Some(v), "push {n}");
    }
}

#[test]
fn malformed_updates_are_dropped() {
    let r = rig(CONFIG);
    let a = external("a", &["THROTTLE"]);
    r.arb.add_actor(a.clone()).unwrap();
    r.arb.start();

    a.push(ActionInput::new("THROTTLE", 0.4), 0.5);
    for (value, confidence) in [
        (0.9, f32::NAN),
        (0.9, 1.5),
        (0.9, -0.1),
        (f32::NAN, 1.0),
        (f32::INFINITY, 1.0),
    ] {
        let out = r.arb.arbitrate(
            a.id(),
            ActionInputWithConfidence::new("THROTTLE", value, confidence),
        );
        assert!(out.is_empty(), "value {value} confidence {confidence}");
    }

    assert_eq!(r.pad.history().len(), 1);
    assert_eq!(r.pad.state().right_trigger, 0.4);
    assert_eq!(r.arb.merged_value(&act("THROTTLE")), 0.4);
    let snap = r.arb.snapshot();
    assert_eq!(snap.actors[0].records[0].confidence, 0.5);
}
