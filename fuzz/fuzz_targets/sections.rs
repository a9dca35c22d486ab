#![no_main]

use libfuzzer_sys::fuzz_target;
use reflscope::{ReflectionInfo, ReflectionSections, SectionRange};

// Treats the first half of the input as a field section and the second half as a capture
// section, with both string pools spanning the whole input.
fuzz_target!(|data: &[u8]| {
    let half = data.len() / 2;
    let sections = ReflectionSections {
        field: SectionRange::new(0, half as u64),
        capture: SectionRange::new(half, (data.len() - half) as u64),
        type_reference: SectionRange::new(0, data.len() as u64),
        reflection_string: SectionRange::new(0, data.len() as u64),
        ..ReflectionSections::default()
    };
    let Ok(info) = ReflectionInfo::new(data, 0x1000, &sections) else {
        return;
    };

    for descriptor in &info.field {
        let Ok(descriptor) = descriptor else {
            break;
        };
        let _ = descriptor.mangled_type_name();
        if let Ok(fields) = descriptor.fields() {
            for field in fields.flatten() {
                let _ = field.field_name();
            }
        }
    }
    for descriptor in &info.capture {
        let Ok(descriptor) = descriptor else {
            break;
        };
        let _ = descriptor.capture_types().map(|types| types.count());
    }
    let _ = reflscope::Image::from_mem(data.to_vec());
});
