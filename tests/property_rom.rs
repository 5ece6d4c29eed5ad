//! Property-based tests for compiler correctness
//!
//! Uses proptest to verify the wire-format invariants hold across many
//! random directory trees: header counts and CRCs, quadlet padding, forward
//! offset arithmetic, and append-only image growth.

use configrom::{compute_crc16, keys, DirectoryId, DirectoryTree, FwAddress, RomImage};
use proptest::prelude::*;

/// Declarative shape of a directory entry, used to build a tree and then
/// verify its serialization independently.
#[derive(Debug, Clone)]
enum Shape {
    Immediate(u8, u32),
    Offset(u8, u32),
    Leaf(u8, Vec<u8>),
    Dir(u8, Vec<Shape>),
}

fn entry_shape() -> impl Strategy<Value = Shape> {
    // Keys below 0x38 so the generation auto-increment never fires here;
    // it gets its own property below.
    let flat = prop_oneof![
        (0u8..0x38, 0u32..0x0100_0000).prop_map(|(k, v)| Shape::Immediate(k, v)),
        (0u8..0x38, 0u32..0x10000).prop_map(|(k, q)| Shape::Offset(k, q)),
        (0u8..0x38, prop::collection::vec(any::<u8>(), 0..24))
            .prop_map(|(k, d)| Shape::Leaf(k, d)),
    ];
    flat.prop_recursive(3, 24, 6, |inner| {
        (0u8..0x38, prop::collection::vec(inner, 0..6)).prop_map(|(k, c)| Shape::Dir(k, c))
    })
}

fn build_dir(tree: &mut DirectoryTree, dir: DirectoryId, shapes: &[Shape]) {
    for shape in shapes {
        match shape {
            Shape::Immediate(key, value) => {
                tree.add_immediate(dir, *key, *value, None).unwrap()
            }
            Shape::Offset(key, quadlet) => tree
                .add_offset(dir, *key, FwAddress::from_csr_offset(quadlet * 4), None)
                .unwrap(),
            Shape::Leaf(key, data) => tree.add_leaf(dir, *key, data, None).unwrap(),
            Shape::Dir(key, children) => {
                let child = tree.new_directory();
                build_dir(tree, child, children);
                tree.add_directory(dir, *key, child, None).unwrap();
            }
        }
    }
}

/// Decode the directory at quadlet `base` and check it against `shapes`.
/// Returns the total quadlets the directory and its payloads consumed.
fn verify_dir(shapes: &[Shape], rom: &RomImage, base: usize) -> usize {
    let header = rom.quadlet(base).unwrap();
    let count = (header >> 16) as usize;
    assert_eq!(count, shapes.len(), "header entry count");

    let words: Vec<u32> = (1..=count).map(|i| rom.quadlet(base + i).unwrap()).collect();
    assert_eq!(
        (header & 0xffff) as u16,
        compute_crc16(&words),
        "header CRC over emitted descriptors"
    );

    let mut payload = base + 1 + count;
    for (index, shape) in shapes.iter().enumerate() {
        let word = words[index];
        let value = (word & 0x00ff_ffff) as usize;
        let key = ((word >> 24) & 0x3f) as u8;
        let entry_type = word >> 30;
        let slot = base + 1 + index;
        match shape {
            Shape::Immediate(shape_key, shape_value) => {
                assert_eq!(entry_type, 0);
                assert_eq!(key, *shape_key);
                assert_eq!(value as u32, *shape_value);
            }
            Shape::Offset(shape_key, shape_quadlet) => {
                assert_eq!(entry_type, 1);
                assert_eq!(key, *shape_key);
                assert_eq!(value as u32, *shape_quadlet);
            }
            Shape::Leaf(shape_key, data) => {
                assert_eq!(entry_type, 2);
                assert_eq!(key, *shape_key);
                assert_eq!(slot + value, payload, "leaf forward offset");

                let leaf_header = rom.quadlet(payload).unwrap();
                let quadlets = (leaf_header >> 16) as usize;
                assert_eq!(quadlets, data.len().div_ceil(4), "padded quadlet length");
                let start = (payload + 1) * 4;
                assert_eq!(&rom.as_bytes()[start..start + data.len()], &data[..]);
                for &byte in &rom.as_bytes()[start + data.len()..start + quadlets * 4] {
                    assert_eq!(byte, 0, "padding byte");
                }
                payload += 1 + quadlets;
            }
            Shape::Dir(shape_key, children) => {
                assert_eq!(entry_type, 3);
                assert_eq!(key, *shape_key);
                assert_eq!(slot + value, payload, "directory forward offset");
                payload += verify_dir(children, rom, payload);
            }
        }
    }
    payload - base
}

proptest! {
    #[test]
    fn prop_compiled_image_decodes_back(shapes in prop::collection::vec(entry_shape(), 0..8)) {
        let mut tree = DirectoryTree::new();
        let root = tree.root();
        build_dir(&mut tree, root, &shapes);

        let mut rom = RomImage::new();
        tree.compile(root, &mut rom).unwrap();

        let consumed = verify_dir(&shapes, &rom, 0);
        prop_assert_eq!(consumed, rom.quadlet_count());
        prop_assert_eq!(consumed, tree.compiled_size(root).unwrap());
    }

    #[test]
    fn prop_recompile_never_rewrites_earlier_bytes(
        shapes in prop::collection::vec(entry_shape(), 0..6)
    ) {
        let mut tree = DirectoryTree::new();
        let root = tree.root();
        build_dir(&mut tree, root, &shapes);

        let mut rom = RomImage::new();
        tree.compile(root, &mut rom).unwrap();
        let first_len = rom.len();
        let first_bytes = rom.as_bytes().to_vec();

        tree.compile(root, &mut rom).unwrap();
        prop_assert_eq!(rom.len(), first_len * 2);
        prop_assert_eq!(&rom.as_bytes()[..first_len], &first_bytes[..]);

        // Without a generation entry both serializations are identical.
        verify_dir(&shapes, &rom, first_len / 4);
    }

    #[test]
    fn prop_image_length_is_quadlet_aligned(
        shapes in prop::collection::vec(entry_shape(), 0..8)
    ) {
        let mut tree = DirectoryTree::new();
        let root = tree.root();
        build_dir(&mut tree, root, &shapes);

        let mut rom = RomImage::new();
        tree.compile(root, &mut rom).unwrap();
        prop_assert_eq!(rom.len() % 4, 0);
    }

    #[test]
    fn prop_generation_advances_once_per_compile(
        initial in 0u32..0x00ff_0000,
        compiles in 1usize..5
    ) {
        let mut tree = DirectoryTree::new();
        let root = tree.root();
        tree.add_immediate(root, keys::GENERATION, initial, None).unwrap();

        let mut last = RomImage::new();
        for _ in 0..compiles {
            last = RomImage::new();
            tree.compile(root, &mut last).unwrap();
        }
        let word = last.quadlet(1).unwrap();
        prop_assert_eq!(word & 0x00ff_ffff, initial + compiles as u32);
    }
}
