#![no_main]

use difftest_core::{Verdict, strip, strip_eq};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: (Vec<u8>, Vec<u8>)| {
    let (a, b) = data;

    // strip is idempotent and never grows its input
    let once = strip(&a);
    assert_eq!(strip(once), once);
    assert!(once.len() <= a.len());

    // strip_eq is symmetric and agrees with comparing stripped forms
    assert_eq!(strip_eq(&a, &b), strip_eq(&b, &a));
    assert_eq!(strip_eq(&a, &b), strip(&a) == strip(&b));

    // judging never panics and only fails when strip_eq does
    let failed = Verdict::judge(a.clone(), b.clone()).is_failed();
    assert_eq!(failed, !strip_eq(&a, &b));
});
