//! Container growth and registry properties

use crate::common::init_logging;
use partio_data::{AttributeType, Particles};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use test_case::test_case;

#[derive(Debug, Clone)]
enum Append {
    One,
    Many(usize),
}

fn append_strategy() -> impl Strategy<Value = Append> {
    prop_oneof![Just(Append::One), (0usize..64).prop_map(Append::Many)]
}

proptest! {
    #[test]
    fn growth_preserves_every_written_value(
        ops in prop::collection::vec(append_strategy(), 1..40)
    ) {
        let mut particles = Particles::new();
        let id = particles.add_attribute("id", AttributeType::Int, 1);
        let velocity = particles.add_attribute("velocity", AttributeType::Vector, 3);

        let mut expected = 0usize;
        for op in ops {
            let start = particles.num_particles();
            let added = match op {
                Append::One => {
                    prop_assert_eq!(particles.add_particle(), start);
                    1
                }
                Append::Many(n) => {
                    let it = particles.add_particles(n);
                    prop_assert_eq!(it.index(), start);
                    n
                }
            };
            for index in start..start + added {
                particles.data_write::<i32>(&id, index)[0] = index as i32;
                particles.data_write::<f32>(&velocity, index)[1] = index as f32 * 0.5;
            }
            expected += added;
            prop_assert!(particles.capacity() >= particles.num_particles());
        }

        prop_assert_eq!(particles.num_particles(), expected);
        for index in 0..expected {
            prop_assert_eq!(particles.data::<i32>(&id, index)[0], index as i32);
            prop_assert_eq!(particles.data::<f32>(&velocity, index)[1], index as f32 * 0.5);
        }
    }

    #[test]
    fn duplicate_names_never_change_the_registry(
        names in prop::collection::vec("[a-c]{1,2}", 1..30)
    ) {
        let mut particles = Particles::new();
        let mut unique = std::collections::BTreeSet::new();
        for name in &names {
            let attr = particles.add_attribute(name, AttributeType::Float, 1);
            prop_assert_eq!(attr.is_valid(), unique.insert(name.clone()));
            prop_assert_eq!(particles.num_attributes(), unique.len());
        }
    }
}

#[test_case(1, 10 ; "first append allocates the minimum")]
#[test_case(10, 10 ; "minimum fills exactly")]
#[test_case(11, 15 ; "grows by half")]
#[test_case(16, 22 ; "second growth")]
#[test_case(23, 33 ; "third growth")]
fn test_single_append_growth(appends: usize, capacity: usize) {
    init_logging();
    let mut particles = Particles::new();
    particles.add_attribute("mass", AttributeType::Float, 1);
    for _ in 0..appends {
        particles.add_particle();
    }
    assert_eq!(particles.num_particles(), appends);
    assert_eq!(particles.capacity(), capacity);
}

#[test_case(0, 10 ; "empty bulk append")]
#[test_case(9, 10 ; "fits the minimum")]
#[test_case(10, 11 ; "one past the minimum")]
#[test_case(20, 21 ; "exact fit")]
fn test_bulk_append_after_one(count: usize, capacity: usize) {
    let mut particles = Particles::new();
    particles.add_attribute("mass", AttributeType::Float, 1);
    particles.add_particle();
    drop(particles.add_particles(count));
    assert_eq!(particles.num_particles(), count + 1);
    assert_eq!(particles.capacity(), capacity);
}

#[test_case(AttributeType::None, "NONE", 0, false, false)]
#[test_case(AttributeType::Vector, "VECTOR", 4, true, false)]
#[test_case(AttributeType::Float, "FLOAT", 4, true, false)]
#[test_case(AttributeType::Int, "INT", 4, false, true)]
#[test_case(AttributeType::IndexedStr, "INDEXEDSTR", 4, false, true)]
fn test_attribute_type_table(
    attr_type: AttributeType,
    name: &str,
    element_size: usize,
    is_float: bool,
    is_integer: bool,
) {
    assert_eq!(attr_type.to_string(), name);
    assert_eq!(attr_type.type_name(), name);
    assert_eq!(attr_type.element_size(), element_size);
    assert_eq!(attr_type.is_float(), is_float);
    assert_eq!(attr_type.is_integer(), is_integer);
}

#[test]
fn test_try_add_particles_overflow_keeps_container() {
    init_logging();
    let mut particles = Particles::new();
    let mass = particles.add_attribute("mass", AttributeType::Float, 1);
    particles.add_particle();
    particles.data_write::<f32>(&mass, 0)[0] = 2.5;

    let err = particles.try_add_particles(usize::MAX).map(|_| ()).unwrap_err();
    assert!(err.is_allocation());
    assert_eq!(particles.num_particles(), 1);
    assert_eq!(particles.capacity(), 10);
    assert_eq!(particles.data::<f32>(&mass, 0), &[2.5]);
}

#[test]
fn test_bulk_append_reallocates_once_to_exact_fit() {
    let mut particles = Particles::new();
    particles.add_attribute("mass", AttributeType::Float, 1);
    particles.add_particle();
    assert_eq!(particles.capacity(), 10);

    drop(particles.add_particles(5));
    assert_eq!(particles.capacity(), 10);

    drop(particles.add_particles(20));
    assert_eq!(particles.num_particles(), 26);
    assert_eq!(particles.capacity(), 26);
}

#[test]
fn test_attribute_lookup_by_name_and_index() {
    let mut particles = Particles::new();
    let position = particles.add_attribute("position", AttributeType::Vector, 3);
    let state = particles.add_attribute("state", AttributeType::IndexedStr, 1);

    assert_eq!(particles.attribute_info("state"), Some(state.clone()));
    assert_eq!(particles.attribute_info_by_index(0), Some(position));
    assert_eq!(particles.attribute_info_by_index(1).map(|a| a.attribute_index), Some(1));
    assert_eq!(particles.attribute_info("missing"), None);
    assert_eq!(particles.attribute_info_by_index(2), None);
}
