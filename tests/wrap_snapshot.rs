use capshala::compose::wrap_caption;

// Wrap layout snapshots use the character-class estimate (no font metrics)
// so they are stable on hosts with no fonts installed.

#[test]
fn english_wrap_layout() {
    let lines = wrap_caption("aaaa aaaa aaaa bb cc", 100.0, 500.0, None);
    insta::assert_snapshot!(lines.join(" | "), @"aaaa aaaa | aaaa bb cc");
}

#[test]
fn urdu_wrap_layout() {
    let lines = wrap_caption("دل سے دل تک", 100.0, 300.0, None);
    insta::assert_snapshot!(lines.join(" | "), @"دل سے | دل تک");
}

#[test]
fn long_word_wrap_layout() {
    let word = "supercalifragilistic";
    let lines = wrap_caption(&format!("tiny {} tiny", word), 100.0, 400.0, None);
    insta::assert_snapshot!(lines.join(" | "), @"tiny | supercalifragilistic | tiny");
}
