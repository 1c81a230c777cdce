/// Script interpreter scenarios: each test loads a small script from memory,
/// runs it to completion and checks the echoed text.
///
/// Scripts are named `if`, so error locations read `[if(<line>)]`.

use skein::script::{MemoryLoader, Script, ScriptEvent, ScriptSettings, ScriptState};
use skein::var::GlobalVars;

// ── Helpers ───────────────────────────────────────────────────────────────────

struct Scenario<'a> {
    lines: &'a [&'a str],
    globals: &'a [(&'a str, &'a str)],
    args: &'a [&'a str],
}

impl<'a> Scenario<'a> {
    fn new(lines: &'a [&'a str]) -> Self {
        Scenario { lines, globals: &[], args: &[] }
    }

    fn globals(mut self, globals: &'a [(&'a str, &'a str)]) -> Self {
        self.globals = globals;
        self
    }

    fn args(mut self, args: &'a [&'a str]) -> Self {
        self.args = args;
        self
    }

    fn run(self) -> Vec<String> {
        let loader = MemoryLoader::new().with("if", &self.lines.join("\n"));
        let globals = GlobalVars::new();
        for (name, value) in self.globals {
            globals.set(*name, *value);
        }
        let mut script = Script::load("if", &loader, globals, ScriptSettings::default())
            .expect("script loads");
        let args: Vec<String> = self.args.iter().map(|s| s.to_string()).collect();
        script.run(&args);
        echoes(&mut script)
    }

    /// Run to completion and compare every echo with `expected`.
    fn expect(self, expected: &[&str]) {
        assert_eq!(self.run(), expected);
    }
}

fn echoes(script: &mut Script) -> Vec<String> {
    script
        .drain_events()
        .into_iter()
        .filter_map(|e| match e {
            ScriptEvent::Echo(text) => Some(text),
            _ => None,
        })
        .collect()
}

fn load(loader: &MemoryLoader, name: &str) -> Script {
    Script::load(name, loader, GlobalVars::new(), ScriptSettings::default()).expect("script loads")
}

// ── Loading ───────────────────────────────────────────────────────────────────

#[test]
fn reads_basic_script() {
    let loader = MemoryLoader::new().with("forage", "mylabel:\n  echo hello");
    let mut script = load(&loader, "forage");
    script.run(&[]);
    assert_eq!(script.lines().len(), 2);
    assert_eq!(script.labels().len(), 1);
}

#[test]
fn includes_other_scripts() {
    let loader = MemoryLoader::new()
        .with("forage", "include util\nmylabel:\n  echo hello")
        .with("util", "something:\n  echo something");
    let script = load(&loader, "forage");
    assert_eq!(script.lines().len(), 4);
    assert_eq!(script.labels().len(), 2);
}

#[test]
fn cannot_include_itself() {
    let loader = MemoryLoader::new().with("forage", "include forage\nmylabel:\n  echo hello");
    let script = load(&loader, "forage");
    assert_eq!(script.lines().len(), 2);
    assert_eq!(script.labels().len(), 1);
}

#[test]
fn later_label_replaces_included_one() {
    let loader = MemoryLoader::new()
        .with("forage", "include util\nalabel:\n  echo hello")
        .with("util", "alabel:\n  echo something");
    let mut script = load(&loader, "forage");
    assert_eq!(script.lines().len(), 4);
    assert_eq!(script.labels().len(), 1);
    assert_eq!(script.labels().get("alabel"), Some(&2));
    script.run(&[]);
    assert_eq!(echoes(&mut script), vec!["something\n", "hello\n"]);
}

#[test]
fn argument_shift() {
    let loader = MemoryLoader::new().with("forage", "mylabel:\n  echo hello");
    let mut script = load(&loader, "forage");
    script.run(&["one".to_owned(), "two".to_owned()]);

    let slots = |s: &Script| s.arg_slots();
    let blank = |n: usize| vec![String::new(); n];

    assert_eq!(script.args(), ["one", "two"]);
    let mut want = vec!["one two".to_owned(), "one".to_owned(), "two".to_owned()];
    want.extend(blank(7));
    assert_eq!(slots(&script), want);

    script.shift_args();
    assert_eq!(script.args(), ["two"]);
    let mut want = vec!["two".to_owned(), "two".to_owned()];
    want.extend(blank(8));
    assert_eq!(slots(&script), want);

    script.shift_args();
    assert!(script.args().is_empty());
    assert_eq!(slots(&script), blank(10));

    script.shift_args();
    assert!(script.args().is_empty());
    assert_eq!(slots(&script), blank(10));
}

// ── if / else ─────────────────────────────────────────────────────────────────

#[test]
fn simple_echo() {
    Scenario::new(&["mylabel:", "  echo hello"]).expect(&["hello\n"]);
}

#[test]
fn if_else_single_lines() {
    Scenario::new(&["if 1 == 2 then echo one", "else echo two"]).expect(&["two\n"]);
    Scenario::new(&["if 2 == 2 then echo one", "else echo two", "echo after"])
        .expect(&["one\n", "after\n"]);
}

#[test]
fn if_else_multiline_blocks() {
    Scenario::new(&[
        "if 1 == 2 then {",
        "  echo one",
        "  echo two",
        "}",
        "else {",
        "  echo three",
        "}",
        "echo after",
    ])
    .expect(&["three\n", "after\n"]);

    Scenario::new(&[
        "if 2 == 2 then {",
        "  echo one",
        "  echo two",
        "}",
        "else {",
        "  echo three",
        "}",
        "echo after",
    ])
    .expect(&["one\n", "two\n", "after\n"]);
}

#[test]
fn else_if_multiline_block() {
    Scenario::new(&[
        "if 1 == 2 then {",
        "  echo one",
        "  echo two",
        "}",
        "else if 1 == 1 {",
        "  echo three",
        "}",
        "else {",
        "  echo four",
        "}",
        "echo after",
    ])
    .expect(&["three\n", "after\n"]);
}

#[test]
fn else_if_single_line_block() {
    Scenario::new(&[
        "if 1 == 2 then {",
        "  echo one",
        "  echo two",
        "}",
        "else if 1 == 1 { echo three }",
        "else {",
        "  echo four",
        "}",
        "echo after",
    ])
    .expect(&["three\n", "after\n"]);
}

#[test]
fn braces_on_their_own_lines() {
    Scenario::new(&[
        "if 1 == 2",
        "{",
        "  echo one",
        "  echo two",
        "}",
        "else",
        "{",
        "  echo four",
        "}",
        "echo after",
    ])
    .expect(&["four\n", "after\n"]);
}

#[test]
fn first_true_branch_wins() {
    Scenario::new(&[
        "if 1 < 2 then echo one",
        "else if 2 == 2 then echo two",
        "else echo three",
    ])
    .expect(&["one\n"]);
}

#[test]
fn else_if_chain_scenario_1() {
    Scenario::new(&[
        "if 1 > 2",
        "{",
        "  echo one",
        "  echo two",
        "}",
        "else if 2 == 2",
        "{",
        "  echo three",
        "}",
        "else if 2 == 2 {",
        "  echo six",
        "}",
        "else {",
        "  echo four",
        "  echo five",
        "}",
    ])
    .expect(&["three\n"]);
}

#[test]
fn else_if_chain_scenario_2() {
    Scenario::new(&[
        "if 1 < 2",
        "{",
        "  echo one",
        "  echo two",
        "}",
        "else if 2 == 2 {",
        "  echo three",
        "}",
        "else if 2 == 2 {",
        "  echo six",
        "}",
        "else {",
        "  echo four",
        "  echo five",
        "}",
    ])
    .expect(&["one\n", "two\n"]);
}

#[test]
fn nested_chains() {
    Scenario::new(&[
        "if 1 < 2",
        "{",
        "  echo one",
        "  echo two",
        "  if 1 == 2",
        "  {",
        "    echo middle",
        "  }",
        "  else if 1 == 1 {",
        "    echo another",
        "  }",
        "  echo after",
        "}",
        "else if 2 == 2 {",
        "  echo three",
        "}",
        "else if 2 == 2 {",
        "  echo six",
        "}",
        "else {",
        "  echo four",
        "  echo five",
        "}",
        "echo end",
    ])
    .expect(&["one\n", "two\n", "another\n", "after\n", "end\n"]);
}

#[test]
fn nested_chains_mixed_braces() {
    Scenario::new(&[
        "if 1 < 2",
        "{",
        "  echo one",
        "  echo two",
        "  if 1 == 2",
        "  {",
        "    echo middle",
        "  }",
        "  else if 1 > 2 {",
        "    echo another",
        "  }",
        "  else echo or else",
        "  echo after",
        "}",
        "else if 2 == 2 {",
        "  echo three",
        "}",
        "else if 2 == 2 {",
        "  echo six",
        "}",
        "else {",
        "  echo four",
        "  echo five",
        "}",
        "echo end",
    ])
    .expect(&["one\n", "two\n", "or else\n", "after\n", "end\n"]);
}

const TRIPLE_NESTED_INNER: &[&str] = &[
    "{",
    "  echo one",
    "  echo two",
    "  if 1 == 2",
    "  {",
    "    echo middle",
    "  }",
    "  else if 2 > 1 {",
    "    echo another",
    "    if 2 == 2 then",
    "    {",
    "      echo trippple threat",
    "      if 3 < 1 then {",
    "        echo do some things",
    "        echo and more things",
    "      }",
    "      else { echo not those things }",
    "    }",
    "    echo after threat",
    "  }",
    "  else echo or else",
    "  echo after",
    "}",
];

#[test]
fn triple_nested_mixed_braces() {
    let mut lines = vec!["if 1 < 2"];
    lines.extend_from_slice(TRIPLE_NESTED_INNER);
    lines.extend_from_slice(&[
        "else if 2 == 2 {",
        "  echo three",
        "}",
        "else if 2 == 2 {",
        "  echo six",
        "}",
        "else {",
        "  echo four",
        "  echo five",
        "}",
        "echo end",
        "if 3 == 3 then { echo yarg }",
    ]);
    Scenario::new(&lines).expect(&[
        "one\n",
        "two\n",
        "another\n",
        "trippple threat\n",
        "not those things\n",
        "after threat\n",
        "after\n",
        "end\n",
        "yarg\n",
    ]);
}

#[test]
fn skips_big_blocks() {
    let mut lines = vec!["if 1 > 2"];
    lines.extend_from_slice(TRIPLE_NESTED_INNER);
    lines.extend_from_slice(&[
        "else if 3 == 2 {",
        "  echo three",
        "}",
        "else if 3 == 2 {",
        "  echo six",
        "}",
        "echo end",
        "if 3 == 3 then { echo yarg }",
    ]);
    assert_eq!(Scenario::new(&lines).run(), vec!["end\n", "yarg\n"]);
}

#[test]
fn braces_without_then() {
    Scenario::new(&["if 3 == 3 { echo yarg }"]).expect(&["yarg\n"]);
}

#[test]
fn skipped_block_hides_inner_chains() {
    Scenario::new(&[
        "if false then {",
        "  if true then echo one",
        "  else if true then echo two",
        "  else echo three",
        "  echo after",
        "}",
        "echo end",
    ])
    .expect(&["end\n"]);

    Scenario::new(&[
        "if false then {",
        "  if true then echo one",
        "  else if {",
        "    echo else if",
        "  }",
        "  else echo else",
        "  echo after",
        "}",
        "echo end",
    ])
    .expect(&["end\n"]);

    Scenario::new(&[
        "if false then {",
        "  if true then echo one",
        "  else if true then echo two",
        "  else {",
        "    echo else",
        "  }",
        "  echo after",
        "}",
        "echo end",
    ])
    .expect(&["end\n"]);
}

#[test]
fn skipped_next_line_takes_its_block_with_it() {
    Scenario::new(&["if 1 == 2", "if 1 == 1 {", "  echo inner", "}", "echo after"])
        .expect(&["after\n"]);
    Scenario::new(&["if 1 == 2", "if 1 == 1", "{", "  echo inner", "}", "echo after"])
        .expect(&["after\n"]);
    Scenario::new(&["if 1 == 2", "if 1 == 1", "echo inner", "echo after"])
        .expect(&["after\n"]);
    Scenario::new(&["if 1 == 1", "if 1 == 1 {", "  echo inner", "}", "echo after"])
        .expect(&["inner\n", "after\n"]);
}

// ── if_N ──────────────────────────────────────────────────────────────────────

#[test]
fn if_arg_count_with_else() {
    let lines = ["if_2 { echo yep one! }", "else {", "  echo else!", "}"];
    Scenario::new(&lines).args(&["one"]).expect(&["else!\n"]);

    let lines = ["if_1 { echo yep one! }", "else {", "  echo else!", "}"];
    Scenario::new(&lines).args(&["one"]).expect(&["yep one!\n"]);

    let lines = ["if_0 { echo yep one! }", "else {", "  echo else!", "}"];
    Scenario::new(&lines).expect(&["yep one!\n"]);
}

#[test]
fn if_arg_body_forms() {
    Scenario::new(&["if_1 then {echo yep}", "echo end"])
        .args(&["one"])
        .expect(&["yep\n", "end\n"]);
    Scenario::new(&["if_1 then {", "  echo yep", "}", "echo end"])
        .args(&["one"])
        .expect(&["yep\n", "end\n"]);
    Scenario::new(&["if_1", "{", "  echo yep", "}", "echo end"])
        .args(&["one"])
        .expect(&["yep\n", "end\n"]);
    Scenario::new(&["if_1 then", "{", "  echo yep", "}", "echo end"])
        .args(&["one"])
        .expect(&["yep\n", "end\n"]);
}

#[test]
fn if_arg_then_else_single_lines() {
    Scenario::new(&["if_2 then", "{", "  echo two", "}", "else if_1 then echo one", "echo end"])
        .args(&["one"])
        .expect(&["one\n", "end\n"]);
    Scenario::new(&["if_2 then", "{", "  echo two", "}", "else echo one", "echo end"])
        .args(&["one"])
        .expect(&["one\n", "end\n"]);
    Scenario::new(&["if_1 then", "{", "  echo one", "}", "if 1 == 1 then echo yes", "echo end"])
        .args(&["one"])
        .expect(&["one\n", "yes\n", "end\n"]);
}

#[test]
fn if_arg_inner_ifs() {
    let lines = [
        "if_1 then {",
        "  if 1 == 1 then echo one",
        "  if 1 == 1 then echo two",
        "}",
        "if 1 == 1 then echo after",
        "echo end",
    ];
    Scenario::new(&lines)
        .args(&["one"])
        .expect(&["one\n", "two\n", "after\n", "end\n"]);
    assert_eq!(Scenario::new(&lines).run(), vec!["after\n", "end\n"]);
}

// ── Conditions ────────────────────────────────────────────────────────────────

#[test]
fn matchre_condition_with_argument() {
    let tail = ["  var exp_threshold %2", "}", "echo %exp_threshold"];
    let cases: &[(&str, &str, &str)] = &[
        (r#"if matchre("%2", "^\d+$") then {"#, "25", "25\n"),
        (r#"if matchre("%2", "^\d+$") && 2==2 then {"#, "25", "25\n"),
        (r#"if matchre("%2", "^\d+$") || 2==2 then {"#, "abcd", "abcd\n"),
        (r#"if 2==2 || matchre("%2", "^\d+$") then {"#, "abcd", "abcd\n"),
        (r#"if matchre("%2", "^\d+$") || 1 == 2 || 2==2 then {"#, "abcd", "abcd\n"),
    ];
    for &(cond, arg, want) in cases {
        let mut lines = vec!["var exp_threshold 10", cond];
        lines.extend_from_slice(&tail);
        Scenario::new(&lines).args(&["exp", arg]).expect(&[want]);
    }
}

#[test]
fn failed_matchre_keeps_default() {
    Scenario::new(&[
        "var exp_threshold 10",
        r#"if matchre("%2", "^\d+$") && 2==2 then {"#,
        "  var exp_threshold %2",
        "}",
        "echo %exp_threshold",
    ])
    .args(&["exp", "abcd"])
    .expect(&["10\n"]);
}

#[test]
fn true_string_in_parens() {
    Scenario::new(&["var temp True", "if (%temp) then { echo var is true }", "else echo nope!"])
        .expect(&["var is true\n"]);
}

#[test]
fn nested_global_reference_in_condition() {
    Scenario::new(&[
        "var next_weapon Offhand_Weapon",
        "var temp_weapon Large_Edged",
        "if $%next_weapon.LearningRate < $%temp_weapon.LearningRate then { echo var is true }",
        "else echo nope!",
    ])
    .globals(&[
        ("Offhand_Weapon.LearningRate", "5"),
        ("Large_Edged.LearningRate", "7"),
    ])
    .expect(&["var is true\n"]);
}

#[test]
fn not_equal_strings() {
    Scenario::new(&[r#"if ("$lefthand" != "Empty") then { echo not equal }"#, "echo end"])
        .expect(&["not equal\n", "end\n"]);
}

#[test]
fn number_in_parens() {
    Scenario::new(&["if (1) then echo yep", "echo done"]).expect(&["yep\n", "done\n"]);
    Scenario::new(&["if (!$standing) then echo nope", "echo done"])
        .globals(&[("standing", "0")])
        .expect(&["nope\n", "done\n"]);
}

#[test]
fn def_checks_globals() {
    let lines = ["if !def(mapwalk) then put #tvar mapwalk 0", "echo $mapwalk"];
    Scenario::new(&lines).expect(&["0\n"]);
    Scenario::new(&lines).globals(&[("mapwalk", "1")]).expect(&["1\n"]);
}

#[test]
fn unknown_function_is_reported_and_false() {
    Scenario::new(&["if nosuch(1) then echo yes", "echo after"])
        .expect(&["[if(1)]: No function registered as nosuch(1)\n", "after\n"]);
}

// ── Captures ──────────────────────────────────────────────────────────────────

#[test]
fn matchre_groups_replace_captures() {
    Scenario::new(&[
        "if ($monstercount > 0) then {",
        r#"    if matchre("$monsterlist","(\w+)$") then {"#,
        "        echo monsterlist = $monsterlist",
        "        echo $1",
        "    }",
        "}",
    ])
    .globals(&[("monsterlist", "a kobold|a kobold|a golden jackal"), ("monstercount", "3")])
    .expect(&["monsterlist = a kobold|a kobold|a golden jackal\n", "jackal\n"]);
}

#[test]
fn matchre_groups_in_parens() {
    Scenario::new(&[
        "var test You glance down to see an unfinished red-leucro headband in your right hand and some razor sharp scissors crafted from animite in your left hand.",
        r#"if (matchre("%test", "^You glance down to see (.+) in your right hand and (.+) in your left hand\.$")) {"#,
        "  echo $1",
        "  echo $2",
        "}",
    ])
    .expect(&[
        "an unfinished red-leucro headband\n",
        "some razor sharp scissors crafted from animite\n",
    ]);
}

fn bank(capture_sigil: char) -> Script {
    let src = [
        "balance:".to_owned(),
        r"  matchre CalcTotals current balance is (.*) (Kronars|Lirums|Dokoras)\.".to_owned(),
        "  put balance".to_owned(),
        "  matchwait".to_owned(),
        "CalcTotals:".to_owned(),
        format!("  var total {capture_sigil}1"),
        r#"if matchre("%total", "(\d+) platinum") then {var platinum $1}"#.to_owned(),
        "else {var platinum 0}".to_owned(),
    ]
    .join("\n");
    let loader = MemoryLoader::new().with("bank", &src);
    load(&loader, "bank")
}

#[test]
fn matchwait_captures_feed_later_lines() {
    for sigil in ['$', '&'] {
        let mut script = bank(sigil);
        assert_eq!(script.run(&[]), ScriptState::WaitingForMatch { timeout: None });
        assert_eq!(script.drain_events(), vec![ScriptEvent::Send("balance".into())]);

        assert!(!script.feed("You have no coins."));
        assert!(script.feed(
            "Your current balance is 16135 platinum, 8 gold, 8 silver, 1 bronze Kronars."
        ));
        assert_eq!(script.run_until_blocked(usize::MAX), ScriptState::Finished);
        assert_eq!(script.locals().get("platinum"), Some("16135"));
    }
}

// ── eval / math / counter ─────────────────────────────────────────────────────

#[test]
fn eval_replacere() {
    Scenario::new(&[
        "var dir swim southwest",
        r#"eval dir replacere("%dir", "^(script |search|swim|web|muck|rt|wait|slow|script|room|ice) ", "")"#,
        "echo %dir",
    ])
    .expect(&["southwest\n"]);

    Scenario::new(&[
        "var replacedList a juvenile wyvern,,a juvenile wyvern,a juvenile wyvern,a juvenile wyvern",
        r#"eval replacedList replacere("%replacedList", ",{2,}", ",")"#,
        "echo %replacedList",
    ])
    .expect(&["a juvenile wyvern,a juvenile wyvern,a juvenile wyvern,a juvenile wyvern\n"]);
}

#[test]
fn eval_numbers() {
    Scenario::new(&["eval temp 1+1", "echo %temp"]).expect(&["2\n"]);
    Scenario::new(&["eval temp 1.6+1.5", "echo %temp"]).expect(&["3.1\n"]);
}

#[test]
fn eval_round_floor_ceil() {
    Scenario::new(&["var value 5.5", "eval value round(%value)", "echo %value"]).expect(&["6\n"]);
    Scenario::new(&[
        "var totaltime 3800",
        "eval hours %totaltime / 3600",
        "evalmath hours floor(%hours)",
        "echo %hours",
    ])
    .expect(&["1\n"]);
    Scenario::new(&[
        "var totaltime 3800",
        "eval hours %totaltime / 3600",
        "evalmath hours ceil(%hours)",
        "echo %hours",
    ])
    .expect(&["2\n"]);
}

#[test]
fn math_with_global_operand() {
    Scenario::new(&[
        "var hunt_timer 32",
        "var temp $gametime",
        "math temp add %hunt_timer",
        "echo %temp",
    ])
    .globals(&[("gametime", "1638082872")])
    .expect(&["1638082904\n"]);
}

#[test]
fn math_operations() {
    let cases: &[(&[&str], &str)] = &[
        (&["math temp - 1"], "-1\n"),
        (&["var temp", "math temp - 1"], "-1\n"),
        (&["var temp 2", "math temp - 1"], "1\n"),
        (&["var temp 2", "math temp sub 1"], "1\n"),
        (&["var temp 2", "math temp subtract 1"], "1\n"),
        (&["var temp 2", "math temp + 1"], "3\n"),
        (&["var temp 4", "math temp / 2"], "2\n"),
        (&["var temp 4", "math temp % 3"], "1\n"),
    ];
    for &(setup, want) in cases {
        let mut lines = setup.to_vec();
        lines.push("echo %temp");
        Scenario::new(&lines).expect(&[want]);
    }
}

#[test]
fn math_divide_by_zero() {
    let got = Scenario::new(&["var temp 4", "math temp / 0", "echo %temp"]).run();
    assert_eq!(got, vec!["[if(2)]: cannot divide by zero!\n", "4\n"]);
}

#[test]
fn math_variable_name_from_reference() {
    Scenario::new(&["var temp Dokoras", "math %tempTotal add 4168", "echo Doks: %DokorasTotal"])
        .expect(&["Doks: 4168\n"]);
}

#[test]
fn counter_operations() {
    let cases: &[(&[&str], &str)] = &[
        (&["counter - 1"], "-1\n"),
        (&["counter set 5"], "5\n"),
        (&["counter set 2", "counter + 1"], "3\n"),
        (&["counter set 2", "counter add 1"], "3\n"),
        (&["counter set 2", "counter - 1"], "1\n"),
        (&["counter set 2", "counter sub 1"], "1\n"),
        (&["counter set 2", "counter subtract 1"], "1\n"),
        (&["counter set 2", "counter * 2"], "4\n"),
        (&["counter set 2", "counter multiply 2"], "4\n"),
    ];
    for &(setup, want) in cases {
        let mut lines = setup.to_vec();
        lines.push("echo %c");
        Scenario::new(&lines).expect(&[want]);
    }
}

// ── Variables ─────────────────────────────────────────────────────────────────

#[test]
fn longest_defined_name_wins() {
    Scenario::new(&["var tarantulaSkillSet Weapon", "echo %tarantulaSkillSets"])
        .expect(&["Weapons\n"]);
}

#[test]
fn empty_variable_definition() {
    Scenario::new(&["var empty", "echo empty: %empty"]).expect(&["empty: \n"]);
}

#[test]
fn list_indexing() {
    Scenario::new(&["var WeaponArray Offhand_Weapon|Large_Edged", "var temp %WeaponArray[0]", "echo %temp"])
        .expect(&["Offhand_Weapon\n"]);
    Scenario::new(&["var WeaponArray Offhand_Weapon|Large_Edged", "var temp %WeaponArray[1]", "echo %temp"])
        .expect(&["Large_Edged\n"]);
    Scenario::new(&["var pathBack east", "var moveCounter 0", "echo walk %pathBack[%moveCounter]"])
        .expect(&["walk east\n"]);
}

const WEAPON_GLOBALS: &[(&str, &str)] = &[
    ("Offhand_Weapon.Ranks", "555.50"),
    ("Offhand_Weapon.LearningRate", "5"),
    ("Large_Edged.Ranks", "777.70"),
    ("Large_Edged.LearningRate", "7"),
];

#[test]
fn indexed_names_inside_references() {
    Scenario::new(&[
        "var WeaponArray Offhand_Weapon|Large_Edged",
        "var c 0",
        "var temp $%WeaponArray[%c].Ranks,$%WeaponArray[%c].LearningRate",
        "echo %temp",
    ])
    .globals(WEAPON_GLOBALS)
    .expect(&["555.50,5\n"]);

    Scenario::new(&[
        "var WeaponArray Offhand_Weapon|Large_Edged",
        "var c 1",
        "var b %c",
        "var temp $%WeaponArray[%b].Ranks,$%WeaponArray[%c].LearningRate",
        "echo %temp",
    ])
    .globals(WEAPON_GLOBALS)
    .expect(&["777.70,7\n"]);

    Scenario::new(&[
        "var WeaponArray Offhand_Weapon|Large_Edged",
        "var attacks_Large_Edged 10",
        "var c 1",
        "var temp $%WeaponArray[%c].Ranks,$%WeaponArray[%c].LearningRate,%attacks_%WeaponArray[%c]",
        "echo %temp",
    ])
    .globals(WEAPON_GLOBALS)
    .expect(&["777.70,7,10\n"]);
}

#[test]
fn paren_index_on_nested_reference() {
    Scenario::new(&[
        "var moon Katamba",
        "gosub moon_check",
        "goto end",
        "moon_check:",
        "  var offset_check $%moon_offset",
        "  if $%moon_offset(2) = above && $%moon_offset(3) = eastern then {",
        "    echo yep!",
        "  }",
        "end:",
        "echo done",
    ])
    .globals(&[("Katamba_offset", "1639421208|one|above|eastern")])
    .expect(&["yep!\n", "done\n"]);
}

#[test]
fn unresolved_reference_is_left_as_is() {
    Scenario::new(&["var moon Katamba", "echo $%moon_offset(2)", "echo done"])
        .expect(&["$Katamba_offset[2]\n", "done\n"]);
}

#[test]
fn put_sets_globals() {
    Scenario::new(&["put #tvar mapwalk 0", "echo $mapwalk"]).expect(&["0\n"]);
    Scenario::new(&["put #var mapwalk 0", "echo $mapwalk"]).expect(&["0\n"]);
}

// ── gosub ─────────────────────────────────────────────────────────────────────

const GO_SUB: &[&str] = &[
    "go:",
    "  var dir $0",
    "  echo dir: %dir",
    "  var type default",
    r#"  if matchre("%dir", "^(script|search|swim|climb|web|muck|rt|wait|slow|drag|script|room|ice) ") then"#,
    "  {",
    "    var type $1",
    r#"    eval dir replacere("%dir", "^(script |search|swim|web|muck|rt|wait|slow|script|room|ice) ", "")"#,
    "  }",
    "  echo dir: %dir",
    "  echo type: %type",
    "  return",
    "end:",
];

#[test]
fn gosub_with_quoted_argument() {
    Scenario::new(&[
        r#"gosub go "swim southwest""#,
        "goto end",
        "go:",
        "  var dir $1",
        "  echo dir: %dir",
        "  var type default",
        r#"  if matchre("%dir", "^(script|search|swim|climb|web|muck|rt|wait|slow|drag|script|room|ice) ") then"#,
        "  {",
        "    var type $1",
        r#"    eval dir replacere("%dir", "^(script |search|swim|web|muck|rt|wait|slow|script|room|ice) ", "")"#,
        "  }",
        "  return",
        "end:",
        "  echo dir: %dir",
        "  echo type: %type",
    ])
    .expect(&["dir: swim southwest\n", "dir: southwest\n", "type: swim\n"]);
}

#[test]
fn gosub_with_shifted_arguments() {
    let expected = [
        "dir: swim southwest\n",
        "dir: southwest\n",
        "type: swim\n",
        "dir: swim west\n",
        "dir: west\n",
        "type: swim\n",
    ];
    for zero in ["$0", "&0"] {
        let mut lines = vec!["gosub go %1", "shift", "gosub go %1", "goto end"];
        let body: Vec<String> = GO_SUB.iter().map(|l| l.replace("$0", zero)).collect();
        lines.extend(body.iter().map(String::as_str));
        let got = Scenario::new(&lines)
            .args(&[r#""swim southwest""#, r#""swim west""#])
            .run();
        assert_eq!(got, expected, "with {zero}");
    }
}

#[test]
fn gosub_without_arguments() {
    Scenario::new(&[
        "gosub release",
        "goto end",
        "release:",
        "  var releaseVar &0",
        "  echo release %releaseVar",
        "  return",
        "end:",
        "  echo done",
    ])
    .expect(&["release \n", "done\n"]);
}

#[test]
fn gosub_within_if_blocks() {
    Scenario::new(&[
        "if 1 == 1 then {",
        "  if (1 < 5) then {",
        "    gosub one",
        "    gosub two",
        "    math temp add 1",
        "    }",
        "  if (8 > 7) then echo next",
        "  echo after",
        "}",
        "goto end",
        "one:",
        "  echo one",
        "  return",
        "two:",
        "  echo two",
        "  return",
        "end:",
        "  echo %temp",
        "  echo done",
    ])
    .expect(&["one\n", "two\n", "next\n", "after\n", "1\n", "done\n"]);
}
