#![no_main]
use bitpack::{Mode, Packed};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|values: Vec<u64>| {
    for mode in Mode::ALL {
        let packed = Packed::from_values(mode, &values).unwrap();
        assert_eq!(packed.to_list(), values);

        let bytes = packed.to_bytes().unwrap();
        let back = Packed::from_bytes(&bytes).unwrap();
        assert_eq!(back, packed);
    }
});
