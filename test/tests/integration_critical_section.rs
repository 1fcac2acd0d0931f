/// INTEGRATION TEST: Critical section batching
///
/// Everything delivered inside a critical section is applied when the
/// outermost section closes: removals first, then additions, then authority
/// changes, then resolutions reported while the section was open.

use fabric_client::{ReceiverEvent, WorkerOp};
use fabric_shared::{Authority, ObjectRef, ObjectWorld};
use fabric_test::{
    assert_constructed, assert_not_constructed, invocation, multicast,
    test_protocol::{CHARACTER_CLASS, CRATE_CLASS, ROOT_DATA_COMPONENT},
    FieldWrite, LocalValue, TestEntityBuilder, TestReceiver, TestValue,
};

fn init_logging() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init()
        .ok();
}

#[test]
fn nothing_is_built_until_the_section_closes() {
    let mut test = TestReceiver::new();
    let entity = TestEntityBuilder::new(1, CHARACTER_CLASS);

    test.process(WorkerOp::CriticalSection(true));
    test.process_all(entity.add_ops());

    assert!(test.receiver.in_critical_section());
    assert_not_constructed!(test, 1);
    assert!(test.world.instantiated.is_empty());

    test.process(WorkerOp::CriticalSection(false));

    assert!(!test.receiver.in_critical_section());
    assert_constructed!(test, 1);
    assert_eq!(test.world.instantiated.len(), 1);
}

#[test]
fn components_of_a_section_are_applied_before_finalize() {
    let mut test = TestReceiver::new();
    let entity = TestEntityBuilder::new(1, CHARACTER_CLASS)
        .with_fields(ROOT_DATA_COMPONENT, vec![FieldWrite::at(0, TestValue::Int(42))]);

    test.process_all(entity.section_ops());

    let root = test.root(1).expect("entity should be constructed");
    assert_eq!(test.world.field(&root, 0), Some(&LocalValue::Int(42)));
    assert_eq!(test.world.finalized, vec![root]);
    assert!(test.world.object(&root).unwrap().finalized);
}

#[test]
fn remove_then_add_in_one_section_rebuilds_the_entity() {
    init_logging();

    let mut test = TestReceiver::new();
    let entity = TestEntityBuilder::new(7, CRATE_CLASS);
    test.process_all(entity.section_ops());
    let first_root = test.root(7).expect("entity should be constructed");

    test.process(WorkerOp::CriticalSection(true));
    test.process(WorkerOp::RemoveEntity(7));
    test.process_all(entity.add_ops());
    test.process(WorkerOp::CriticalSection(false));

    assert_constructed!(test, 7);
    let second_root = test.root(7).unwrap();
    assert_ne!(first_root, second_root);
    assert!(!test.world.is_alive(&first_root));
    assert_eq!(test.world.live_roots_of(7), vec![second_root]);
    assert_eq!(test.world.roots_of(7).len(), 2);
}

#[test]
fn add_then_remove_in_one_section_leaves_nothing() {
    let mut test = TestReceiver::new();
    let entity = TestEntityBuilder::new(7, CRATE_CLASS);

    test.process(WorkerOp::CriticalSection(true));
    test.process_all(entity.add_ops());
    test.process(WorkerOp::AuthorityChange(7, ROOT_DATA_COMPONENT, Authority::Authoritative));
    test.process(WorkerOp::RemoveEntity(7));
    test.process(WorkerOp::CriticalSection(false));

    assert_not_constructed!(test, 7);
    assert!(test.world.instantiated.is_empty());
    assert!(test.world.authority_changes.is_empty());
    assert!(test.receiver.deferred_constructor().is_empty());
    assert!(test.take_events().is_empty());
}

#[test]
fn removal_of_a_live_entity_waits_for_the_section() {
    let mut test = TestReceiver::new();
    test.process_all(TestEntityBuilder::new(3, CRATE_CLASS).section_ops());
    let root = test.root(3).unwrap();

    test.process(WorkerOp::CriticalSection(true));
    test.process(WorkerOp::RemoveEntity(3));
    assert_constructed!(test, 3);
    assert!(test.world.is_alive(&root));

    test.process(WorkerOp::CriticalSection(false));
    assert_not_constructed!(test, 3);
    assert!(!test.world.is_alive(&root));
    assert_eq!(test.world.destroyed, vec![root]);
}

#[test]
fn nested_sections_drain_once_at_the_outermost_close() {
    let mut test = TestReceiver::new();

    test.process(WorkerOp::CriticalSection(true));
    test.process(WorkerOp::CriticalSection(true));
    test.process_all(TestEntityBuilder::new(1, CRATE_CLASS).add_ops());
    test.process(WorkerOp::CriticalSection(false));

    assert!(test.receiver.in_critical_section());
    assert_not_constructed!(test, 1);

    test.process_all(TestEntityBuilder::new(2, CRATE_CLASS).add_ops());
    test.process(WorkerOp::CriticalSection(false));

    assert!(!test.receiver.in_critical_section());
    assert_constructed!(test, 1);
    assert_constructed!(test, 2);

    let events = test.take_events();
    assert_eq!(TestReceiver::constructed_entities(&events), vec![1, 2]);
}

#[test]
fn unmatched_section_end_is_ignored() {
    let mut test = TestReceiver::new();

    test.process(WorkerOp::CriticalSection(false));
    assert!(!test.receiver.in_critical_section());

    test.process_all(TestEntityBuilder::new(1, CRATE_CLASS).add_ops());
    assert_constructed!(test, 1);
}

#[test]
fn operations_outside_a_section_apply_immediately() {
    let mut test = TestReceiver::new();
    let entity = TestEntityBuilder::new(4, CRATE_CLASS);

    test.process_all(entity.add_ops());
    assert_constructed!(test, 4);

    test.process(WorkerOp::AuthorityChange(4, ROOT_DATA_COMPONENT, Authority::Authoritative));
    assert_eq!(test.world.authority_changes.len(), 1);
    assert_eq!(
        test.receiver.channel(&4).unwrap().authority(&ROOT_DATA_COMPONENT),
        Authority::Authoritative
    );

    test.process(WorkerOp::RemoveEntity(4));
    assert_not_constructed!(test, 4);
}

#[test]
fn authority_changes_apply_after_additions() {
    let mut test = TestReceiver::new();

    test.process(WorkerOp::CriticalSection(true));
    test.process(WorkerOp::AuthorityChange(5, ROOT_DATA_COMPONENT, Authority::Authoritative));
    test.process_all(TestEntityBuilder::new(5, CRATE_CLASS).add_ops());
    test.process(WorkerOp::CriticalSection(false));

    let root = test.root(5).unwrap();
    assert_eq!(
        test.world.authority_changes,
        vec![(root, ROOT_DATA_COMPONENT, Authority::Authoritative)]
    );

    let events = test.take_events();
    let constructed_at = events
        .iter()
        .position(|event| matches!(event, ReceiverEvent::EntityConstructed { .. }))
        .unwrap();
    let changed_at = events
        .iter()
        .position(|event| matches!(event, ReceiverEvent::AuthorityChanged { .. }))
        .unwrap();
    assert!(constructed_at < changed_at);
}

#[test]
fn resolutions_reported_inside_a_section_are_replayed_after_it() {
    let mut test = TestReceiver::new();
    test.process_all(TestEntityBuilder::new(1, CHARACTER_CLASS).section_ops());
    let root = test.root(1).unwrap();

    let missing = ObjectRef::root(99);
    test.process(multicast(1, vec![invocation(3, vec![TestValue::Ref(missing)])]));
    assert!(test.world.executed_rpcs.is_empty());

    let local = test.world.spawn_local("Pickup");
    test.process(WorkerOp::CriticalSection(true));
    test.receiver
        .resolve_pending_operations(&mut test.world, local, missing);

    assert_eq!(test.receiver.object_for_ref(&missing), Some(local));
    assert!(test.world.executed_rpcs.is_empty());

    test.process(WorkerOp::CriticalSection(false));

    let executed = test.world.rpcs_on(&root);
    assert_eq!(executed.len(), 1);
    assert_eq!(executed[0].args, vec![LocalValue::Object(Some(local))]);
}

#[test]
fn receiver_locks_an_unlocked_protocol() {
    let mut builder = fabric_shared::Protocol::builder();
    builder.add_plugin(fabric_test::test_protocol::CharacterPlugin);
    let protocol = builder.build();
    assert!(!protocol.is_locked());

    let receiver = fabric_client::Receiver::new(fabric_client::ReceiverConfig::default(), protocol);

    assert!(receiver.protocol().is_locked());
    assert_eq!(receiver.protocol().component_bindings.len(), 6);
}
