use crate::sim::SimTime;

#[test]
fn sim_time_unit_conversions() {
    assert_eq!(SimTime::from_micros(1), SimTime(1_000));
    assert_eq!(SimTime::from_millis(1), SimTime(1_000_000));
}

#[test]
fn sim_time_unit_conversions_saturate_on_overflow() {
    assert_eq!(SimTime::from_micros(u64::MAX), SimTime(u64::MAX));
    assert_eq!(SimTime::from_millis(u64::MAX), SimTime(u64::MAX));
}

#[test]
fn sim_time_saturating_sub_stops_at_zero() {
    let t = SimTime(30);
    assert_eq!(t.saturating_sub(SimTime(10)), SimTime(20));
    assert_eq!(t.saturating_sub(SimTime(40)), SimTime::ZERO);
    assert!(t.saturating_sub(SimTime(40)).is_zero());
    assert_eq!(SimTime(u64::MAX).saturating_add(SimTime(1)), SimTime(u64::MAX));
}

#[test]
fn sim_time_display_in_nanos() {
    assert_eq!(SimTime(1_500).to_string(), "1500ns");
}
