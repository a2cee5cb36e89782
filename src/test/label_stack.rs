use crate::error::Error;
use crate::net::{
    Label, LabelAllocator, LabelStack, DEFAULT_LABEL_TTL, MAX_LABEL_VALUE, MAX_RESERVED_LABEL,
    MPLS_LABEL_BYTES,
};

#[test]
fn label_stack_is_lifo_and_tracks_bottom_of_stack() {
    let mut stack = LabelStack::new();
    assert!(stack.is_empty());
    assert!(stack.top().is_none());

    stack.push(Label::new(0, 100));
    stack.push(Label::new(1, 200));
    stack.push(Label::new(2, 300));
    assert_eq!(stack.len(), 3);
    assert_eq!(stack.size_bytes(), 3 * MPLS_LABEL_BYTES);

    let values: Vec<u32> = stack.iter().map(|l| l.value).collect();
    assert_eq!(values, vec![300, 200, 100]);
    let bos: Vec<bool> = stack.iter().map(|l| l.bos).collect();
    assert_eq!(bos, vec![false, false, true]);

    assert_eq!(stack.pop().map(|l| l.value), Some(300));
    assert_eq!(stack.top().map(|l| l.value), Some(200));
    assert_eq!(stack.pop().map(|l| l.value), Some(200));
    assert_eq!(stack.pop().map(|l| l.value), Some(100));
    assert!(stack.pop().is_none());
}

#[test]
fn label_stack_swap_and_ttl_only_touch_the_top() {
    let mut stack = LabelStack::new();
    assert_eq!(stack.swap_top(5), None);
    assert_eq!(stack.decrement_top_ttl(), None);

    stack.push(Label::new(0, 100));
    stack.push(Label::new(1, 200).with_ttl(2));

    assert_eq!(stack.swap_top(250), Some(200));
    assert_eq!(stack.decrement_top_ttl(), Some(1));
    assert_eq!(stack.decrement_top_ttl(), Some(0));
    assert_eq!(stack.decrement_top_ttl(), Some(0));

    let bottom = stack.iter().last().copied().expect("bottom label");
    assert_eq!(bottom.value, 100);
    assert_eq!(bottom.ttl, DEFAULT_LABEL_TTL);
}

#[test]
fn exp_is_masked_and_reserved_range_is_detected() {
    let label = Label::new(0, 6).with_exp(0b1111);
    assert_eq!(label.exp, 0b111);
    assert!(label.is_reserved());
    assert!(!Label::new(0, 16).is_reserved());
    assert_eq!(Label::new(0, MAX_LABEL_VALUE).value, MAX_LABEL_VALUE);
}

#[test]
#[cfg(debug_assertions)]
#[should_panic(expected = "exceeds 20 bits")]
fn label_value_wider_than_20_bits_is_rejected() {
    let _ = Label::new(0, MAX_LABEL_VALUE + 7);
}

#[test]
#[cfg(debug_assertions)]
#[should_panic(expected = "exceeds 20 bits")]
fn swap_to_out_of_range_value_is_rejected() {
    let mut stack = LabelStack::new();
    stack.push(Label::new(0, 100));
    stack.swap_top(MAX_LABEL_VALUE + 1);
}

#[test]
fn label_allocator_skips_reserved_values_and_stops_at_the_top() {
    let mut labels = LabelAllocator::default();
    assert_eq!(labels.next_label().unwrap(), MAX_RESERVED_LABEL + 1);
    assert_eq!(labels.next_label().unwrap(), MAX_RESERVED_LABEL + 2);

    assert_eq!(LabelAllocator::starting_at(3).next_label().unwrap(), MAX_RESERVED_LABEL + 1);

    let mut near_end = LabelAllocator::starting_at(MAX_LABEL_VALUE);
    assert_eq!(near_end.next_label().unwrap(), MAX_LABEL_VALUE);
    let err = near_end.next_label().unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    // 耗尽后保持报错，不回绕到保留区
    assert!(near_end.next_label().is_err());
}

#[test]
fn label_stack_clear_empties_the_stack() {
    let mut stack = LabelStack::new();
    stack.push(Label::new(0, 100));
    stack.push(Label::new(1, 200));
    stack.clear();
    assert!(stack.is_empty());
    assert_eq!(stack.size_bytes(), 0);

    // 清空后再压栈的标签重新成为栈底
    stack.push(Label::new(2, 300));
    assert!(stack.top().expect("top").bos);
}
