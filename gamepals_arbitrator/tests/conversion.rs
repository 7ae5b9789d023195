use std::sync::Arc;
use std::time::{Duration, Instant};

use gamepals_arbitrator::*;
use gamepals_core::*;

const CONFIG: &str = r#"{
    "game_inputs": {
        "JUMP": ["BTN_A"],
        "STEER": ["STICK_LEFT_X_POS", "STICK_LEFT_X_NEG"],
        "THROTTLE": ["TRIGGER_RIGHT", "TRIGGER_LEFT"],
        "LEAN": ["BUMPER_RIGHT", "BUMPER_LEFT"],
        "FIRE": ["BTN_X"],
        "BURST": ["BTN_Y"],
        "BRAKE": ["DIR_PAD_Y"],
        "GAS": ["BTN_B"],
        "NITRO": ["THUMB_RIGHT"],
        "BOOST": ["BTN_START"],
        "RADIO": ["BTN_BACK"]
    },
    "humans": {
        "0": {
            "actions": {
                "JUMP": { "controls": ["BTN_A"] },
                "STEER": { "controls": ["STICK_LEFT_X_POS", "STICK_LEFT_X_NEG"] },
                "THROTTLE": { "controls": ["TRIGGER_RIGHT", "TRIGGER_LEFT"] },
                "LEAN": { "controls": ["BUMPER_RIGHT", "BUMPER_LEFT"] },
                "FIRE": { "controls": ["BTN_X"] },
                "BURST": { "controls": ["BTN_X"] },
                "BRAKE": { "controls": ["BTN_A"] },
                "GAS": { "controls": ["BTN_B"] },
                "NITRO": { "controls": [] },
                "BOOST": { "controls": ["BTN_Y"] }
            }
        }
    }
}"#;

fn cfg() -> Arc<ArbitrationCfg> {
    Arc::new(ArbitrationCfg::from_json(CONFIG).unwrap())
}

fn act(s: &str) -> GameAction {
    GameAction::from(s)
}

fn ci(kind: InputType, value: f32) -> ControllerInput {
    ControllerInput::new(kind, value)
}

fn ai(action: &str, value: f32) -> ActionInput {
    ActionInput::new(action, value)
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[test]
fn one_to_one_round_trip() {
    let mgr = ActionConversionManager::new(cfg(), Vec::new());

    let out = mgr.action_to_inputs(&ai("JUMP", 1.0));
    assert_eq!(out, vec![ci(InputType::BtnA, 1.0)]);
    assert_eq!(mgr.input_to_game_actions(&out[0]), vec![ai("JUMP", 1.0)]);
}

#[test]
fn split_stick_round_trip() {
    let mgr = ActionConversionManager::new(cfg(), Vec::new());

    for v in [-0.5_f32, -1.0, 0.0, 0.25, 1.0] {
        let out = mgr.action_to_inputs(&ai("STEER", v));
        assert_eq!(out.len(), 1);
        let expected = if v < 0.0 {
            InputType::StickLeftXNeg
        } else {
            InputType::StickLeftXPos
        };
        assert_eq!(out[0].kind, expected, "value {v}");
        assert_eq!(mgr.input_to_game_actions(&out[0]), vec![ai("STEER", v)]);
    }

    // A negative half reporting its magnitude still reads back as negative.
    assert_eq!(
        mgr.input_to_game_actions(&ci(InputType::StickLeftXNeg, 0.5)),
        vec![ai("STEER", -0.5)]
    );
}

#[test]
fn output_only_actions_still_convert() {
    let mgr = ActionConversionManager::new(cfg(), Vec::new());
    assert_eq!(
        mgr.action_to_inputs(&ai("RADIO", 1.0)),
        vec![ci(InputType::BtnBack, 1.0)]
    );
    assert!(mgr.action_to_inputs(&ai("HORN", 1.0)).is_empty());
    assert!(mgr.input_to_game_actions(&ci(InputType::ThumbLeft, 1.0)).is_empty());
}

#[test]
fn default_delegate_queues_press_then_release() {
    let mgr = ActionConversionManager::new(cfg(), Vec::new());
    let t0 = Instant::now();

    // JUMP and BRAKE share BTN_A: both actions fire.
    let out = mgr.input_to_actions_at(0, Some(ci(InputType::BtnA, 1.0)), t0);
    assert_eq!(out, vec![ai("JUMP", 1.0), ai("BRAKE", 1.0)]);

    // Press and release before a poll: the release waits for the next call.
    let mut d = DefaultDelegate::new(cfg(), 0, act("GAS"));
    d.register_input(ci(InputType::BtnB, 1.0), t0);
    d.register_input(ci(InputType::BtnB, 0.0), t0 + ms(5));
    assert_eq!(d.ready_actions(t0 + ms(5)), vec![ai("GAS", 1.0)]);
    assert_eq!(d.ready_actions(t0 + ms(6)), vec![ai("GAS", 0.0)]);
    assert!(d.ready_actions(t0 + ms(7)).is_empty());
}

#[test]
fn unmapped_controller_input_is_ignored() {
    let mgr = ActionConversionManager::new(cfg(), Vec::new());
    let out = mgr.input_to_actions_at(0, Some(ci(InputType::ThumbLeft, 1.0)), Instant::now());
    assert!(out.is_empty());
    let out = mgr.input_to_actions_at(9, Some(ci(InputType::BtnA, 1.0)), Instant::now());
    assert!(out.is_empty());
}

#[test]
fn axis_negates_the_negative_trigger() {
    let c = cfg();
    let axis = AxisDelegate::new(c.clone(), 0, act("THROTTLE")).unwrap();
    let mgr = ActionConversionManager::new(c, vec![Box::new(axis) as Box<dyn ConversionDelegate>]);
    let t0 = Instant::now();

    let out = mgr.input_to_actions_at(0, Some(ci(InputType::TriggerLeft, 0.7)), t0);
    assert_eq!(out, vec![ai("THROTTLE", -0.7)]);
    let out = mgr.input_to_actions_at(0, Some(ci(InputType::TriggerRight, 0.4)), t0);
    assert_eq!(out, vec![ai("THROTTLE", 0.4)]);

    assert_eq!(
        mgr.action_to_inputs(&ai("THROTTLE", -0.7)),
        vec![ci(InputType::TriggerLeft, -0.7)]
    );
    assert_eq!(
        mgr.input_to_game_actions(&ci(InputType::TriggerLeft, 0.7)),
        vec![ai("THROTTLE", -0.7)]
    );
}

#[test]
fn axis_keeps_stick_sign() {
    let mut d = AxisDelegate::new(cfg(), 0, act("STEER")).unwrap();
    let t0 = Instant::now();
    d.register_input(ci(InputType::StickLeftXNeg, -0.3), t0);
    assert_eq!(d.ready_actions(t0), vec![ai("STEER", -0.3)]);
}

#[test]
fn axis_rejects_single_input_mapping() {
    let err = AxisDelegate::new(cfg(), 0, act("JUMP")).unwrap_err();
    assert!(matches!(err, ArbitrationError::InvalidMapping { ref action, .. } if *action == act("JUMP")));
}

#[test]
fn binary_pair_drives_both_buttons() {
    let d = BinaryPairDelegate::new(cfg(), 0, act("LEAN")).unwrap();
    assert_eq!(
        d.convert_to_inputs(&ai("LEAN", -1.0)),
        vec![ci(InputType::BumperLeft, 1.0), ci(InputType::BumperRight, 0.0)]
    );
    assert_eq!(
        d.convert_to_inputs(&ai("LEAN", 1.0)),
        vec![ci(InputType::BumperRight, 1.0), ci(InputType::BumperLeft, 0.0)]
    );
    assert_eq!(
        d.convert_from_input(&ci(InputType::BumperLeft, 1.0)),
        vec![ai("LEAN", -1.0)]
    );
}

#[test]
fn binary_pair_resumes_the_held_half() {
    let mut d = BinaryPairDelegate::new(cfg(), 0, act("LEAN")).unwrap();
    let t0 = Instant::now();

    d.register_input(ci(InputType::BumperRight, 1.0), t0);
    assert_eq!(d.ready_actions(t0), vec![ai("LEAN", 1.0)]);

    d.register_input(ci(InputType::BumperLeft, 1.0), t0 + ms(10));
    assert_eq!(d.ready_actions(t0 + ms(10)), vec![ai("LEAN", -1.0)]);

    // Left released while right is still down: lean right again.
    d.register_input(ci(InputType::BumperLeft, 0.0), t0 + ms(20));
    assert_eq!(d.ready_actions(t0 + ms(20)), vec![ai("LEAN", 1.0)]);

    d.register_input(ci(InputType::BumperRight, 0.0), t0 + ms(30));
    assert_eq!(d.ready_actions(t0 + ms(30)), vec![ai("LEAN", 0.0)]);
}

#[test]
fn binary_pair_rejects_halves_of_one_stick_axis() {
    let err = BinaryPairDelegate::new(cfg(), 0, act("STEER")).unwrap_err();
    assert!(matches!(err, ArbitrationError::InvalidMapping { ref action, .. } if *action == act("STEER")));

    // The same mapping moves the stick through an axis delegate.
    let c = cfg();
    let axis = AxisDelegate::new(c.clone(), 0, act("STEER")).unwrap();
    let mgr = ActionConversionManager::new(c, vec![Box::new(axis) as Box<dyn ConversionDelegate>]);
    let pad = VirtualGamepad::new();
    for input in mgr.action_to_inputs(&ai("STEER", -1.0)) {
        pad.execute(input);
    }
    assert_eq!(pad.state().left_stick, (-1.0, 0.0));
}

#[test]
fn bipolar_mappings_list_the_positive_input_first() {
    let axis = AxisDelegate::new(cfg(), 0, act("THROTTLE")).unwrap();
    assert_eq!(
        axis.convert_to_inputs(&ai("THROTTLE", 0.5)),
        vec![ci(InputType::TriggerRight, 0.5)]
    );
    assert_eq!(
        axis.convert_to_inputs(&ai("THROTTLE", -0.5)),
        vec![ci(InputType::TriggerLeft, -0.5)]
    );

    let pair = BinaryPairDelegate::new(cfg(), 0, act("LEAN")).unwrap();
    assert_eq!(pair.convert_to_inputs(&ai("LEAN", 0.5))[0].kind, InputType::BumperRight);
    assert_eq!(pair.convert_to_inputs(&ai("LEAN", -0.5))[0].kind, InputType::BumperLeft);
}

fn double_function() -> ActionConversionManager {
    let c = cfg();
    let d = DoubleFunctionDelegate::new(c.clone(), 0, act("FIRE"), act("BURST")).unwrap();
    assert_eq!(d.button(), InputType::BtnX);
    ActionConversionManager::new(c, vec![Box::new(d) as Box<dyn ConversionDelegate>])
}

fn only(out: Vec<ActionInput>, actions: &[&str]) -> Vec<ActionInput> {
    out.into_iter()
        .filter(|a| actions.contains(&a.action.as_str()))
        .collect()
}

#[test]
fn double_function_tap_toggles() {
    let mgr = double_function();
    let t0 = Instant::now();
    let ours = ["FIRE", "BURST"];

    let out = mgr.input_to_actions_at(0, Some(ci(InputType::BtnX, 1.0)), t0);
    assert!(only(out, &ours).is_empty());

    let out = mgr.input_to_actions_at(0, Some(ci(InputType::BtnX, 0.0)), t0 + ms(50));
    assert_eq!(only(out, &ours), vec![ai("FIRE", 1.0)]);
    let out = mgr.input_to_actions_at(0, None, t0 + ms(60));
    assert_eq!(only(out, &ours), vec![ai("FIRE", 0.0)]);
    let out = mgr.input_to_actions_at(0, None, t0 + ms(500));
    assert!(only(out, &ours).is_empty());
}

#[test]
fn double_function_hold_fires_once() {
    let mgr = double_function();
    let t0 = Instant::now();
    let ours = ["FIRE", "BURST"];

    mgr.input_to_actions_at(0, Some(ci(InputType::BtnX, 1.0)), t0);
    let out = mgr.input_to_actions_at(0, None, t0 + ms(100));
    assert!(only(out, &ours).is_empty());

    let out = mgr.input_to_actions_at(0, None, t0 + HOLD_THRESHOLD + ms(50));
    assert_eq!(only(out, &ours), vec![ai("BURST", 1.0)]);
    let out = mgr.input_to_actions_at(0, None, t0 + ms(300));
    assert!(only(out, &ours).is_empty());

    let out = mgr.input_to_actions_at(0, Some(ci(InputType::BtnX, 0.0)), t0 + ms(400));
    assert_eq!(only(out, &ours), vec![ai("BURST", 0.0)]);
}

#[test]
fn double_function_decides_late_release_by_elapsed_time() {
    let c = cfg();
    let mut d = DoubleFunctionDelegate::new(c, 0, act("FIRE"), act("BURST"))
        .unwrap()
        .with_threshold(ms(100));
    let t0 = Instant::now();

    // No poll while held: the release alone decides it was a hold.
    d.register_input(ci(InputType::BtnX, 1.0), t0);
    d.register_input(ci(InputType::BtnX, 0.0), t0 + ms(150));
    assert_eq!(d.ready_actions(t0 + ms(150)), vec![ai("BURST", 1.0)]);
    assert_eq!(d.ready_actions(t0 + ms(151)), vec![ai("BURST", 0.0)]);
    assert!(d.ready_actions(t0 + ms(152)).is_empty());
}

#[test]
fn double_function_needs_a_shared_button() {
    let err = DoubleFunctionDelegate::new(cfg(), 0, act("FIRE"), act("GAS")).unwrap_err();
    assert!(matches!(err, ArbitrationError::InvalidMapping { ref action, .. } if *action == act("GAS")));
    let err = DoubleFunctionDelegate::new(cfg(), 0, act("NITRO"), act("GAS")).unwrap_err();
    assert!(matches!(err, ArbitrationError::InvalidMapping { .. }));
}

fn three_for_two(invert: bool) -> ThreeForTwoDelegate {
    ThreeForTwoDelegate::new(cfg(), 0, [act("BRAKE"), act("GAS"), act("NITRO")])
        .unwrap()
        .invert_action_1(invert)
}

#[test]
fn three_for_two_transitions() {
    let mut d = three_for_two(false);
    let t0 = Instant::now();

    d.register_input(ci(InputType::BtnA, 1.0), t0);
    assert_eq!(d.ready_actions(t0), vec![ai("BRAKE", 1.0)]);

    d.register_input(ci(InputType::BtnB, 1.0), t0 + ms(10));
    assert!(d.in_combo());
    assert_eq!(
        d.ready_actions(t0 + ms(10)),
        vec![ai("BRAKE", 0.0), ai("GAS", 0.0), ai("NITRO", 1.0)]
    );

    // Analog jitter while both are down does not re-send the combo.
    d.register_input(ci(InputType::BtnA, 0.9), t0 + ms(15));
    assert!(d.ready_actions(t0 + ms(15)).is_empty());

    d.register_input(ci(InputType::BtnA, 0.0), t0 + ms(20));
    assert!(!d.in_combo());
    assert_eq!(
        d.ready_actions(t0 + ms(20)),
        vec![ai("NITRO", 0.0), ai("GAS", 1.0)]
    );

    d.register_input(ci(InputType::BtnB, 0.0), t0 + ms(30));
    assert_eq!(d.ready_actions(t0 + ms(30)), vec![ai("GAS", 0.0)]);
}

#[test]
fn three_for_two_drops_stale_singles_on_combo() {
    let mut d = three_for_two(false);
    let t0 = Instant::now();

    d.register_input(ci(InputType::BtnA, 1.0), t0);
    d.register_input(ci(InputType::BtnB, 1.0), t0);
    assert_eq!(
        d.ready_actions(t0),
        vec![ai("BRAKE", 0.0), ai("GAS", 0.0), ai("NITRO", 1.0)]
    );
    assert!(d.ready_actions(t0).is_empty());
}

#[test]
fn three_for_two_inverts_first_action() {
    let mut d = three_for_two(true);
    let t0 = Instant::now();
    d.register_input(ci(InputType::BtnA, 1.0), t0);
    assert_eq!(d.ready_actions(t0), vec![ai("BRAKE", -1.0)]);

    d.register_input(ci(InputType::BtnB, 1.0), t0);
    d.ready_actions(t0);
    d.register_input(ci(InputType::BtnB, 0.0), t0);
    assert_eq!(d.ready_actions(t0), vec![ai("NITRO", 0.0), ai("BRAKE", -1.0)]);
}

#[test]
fn three_for_two_needs_distinct_buttons() {
    let err = ThreeForTwoDelegate::new(cfg(), 0, [act("JUMP"), act("BRAKE"), act("NITRO")])
        .unwrap_err();
    assert!(matches!(err, ArbitrationError::InvalidMapping { .. }));
}

#[test]
fn hold_threshold_fires_once_after_the_deadline() {
    let mut d = HoldThresholdDelegate::new(cfg(), 0, act("BOOST"), ms(300)).unwrap();
    let t0 = Instant::now();

    d.register_input(ci(InputType::BtnY, 1.0), t0);
    assert!(d.ready_actions(t0 + ms(100)).is_empty());
    assert_eq!(d.ready_actions(t0 + ms(310)), vec![ai("BOOST", 1.0)]);
    assert!(d.ready_actions(t0 + ms(400)).is_empty());

    d.register_input(ci(InputType::BtnY, 0.0), t0 + ms(500));
    assert_eq!(d.ready_actions(t0 + ms(500)), vec![ai("BOOST", 0.0)]);
}

#[test]
fn hold_threshold_drops_short_taps() {
    let mut d = HoldThresholdDelegate::new(cfg(), 0, act("BOOST"), ms(300)).unwrap();
    let t0 = Instant::now();

    d.register_input(ci(InputType::BtnY, 1.0), t0);
    d.register_input(ci(InputType::BtnY, 0.0), t0 + ms(100));
    assert!(d.ready_actions(t0 + ms(100)).is_empty());
    assert!(d.ready_actions(t0 + ms(1000)).is_empty());
    assert_eq!(d.threshold(), ms(300));
}

#[test]
fn hold_threshold_needs_a_control() {
    let err = HoldThresholdDelegate::new(cfg(), 0, act("NITRO"), ms(300)).unwrap_err();
    assert!(matches!(err, ArbitrationError::InvalidMapping { .. }));
}
