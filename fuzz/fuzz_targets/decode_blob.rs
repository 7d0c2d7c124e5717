#![no_main]
use bitpack::Packed;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must either be rejected or decode to a fully readable array.
    if let Ok(packed) = Packed::from_bytes(data) {
        let values = packed.to_list();
        assert_eq!(values.len(), packed.len());
        for (i, &v) in values.iter().enumerate() {
            assert_eq!(packed.get(i).unwrap(), v);
        }
        assert!(packed.get(packed.len()).is_err());
    }
});
