use ninjagen_lib::ninja::NinjaGenerator;
use ninjagen_lib::query::{CommandStage, Query, QueryError, TypeTag, UnitStage, file_stem};
use ninjagen_lib::vars::Variables;

use super::common::{build_lines, project, read};

fn compile(vars: &Variables, name: &str, ext: &str) -> CommandStage {
  CommandStage::new(vars, name, |inputs| format!("$obj/{}.o", file_stem(&inputs[0])))
    .accepts([ext])
    .args(["$cc", "-c", "$$in", "-o", "$$out"])
    .description(format!("{} $$out", name.to_uppercase()))
}

fn archive(vars: &Variables) -> CommandStage {
  CommandStage::new(vars, "ar", |_| "$lib/libcore.a".to_string())
    .accepts(["o"])
    .args(["ar", "rcs", "$$out", "$$in"])
    .order_only(["$obj"])
}

#[test]
fn mixed_sources_compile_then_archive() {
  let (temp, vars) = project(&["src/main.c", "src/util.c", "src/boot.s", "src/README.md"]);
  let ninja_path = temp.path().join("build.ninja");

  let ninja = NinjaGenerator::create(&ninja_path).unwrap();
  let cc = ninja.bind(compile(&vars, "cc", "c"));
  let asm = ninja.bind(compile(&vars, "as", "s"));
  let ar = ninja.bind(archive(&vars));

  let objects = Query::select(&vars, "$src/*.c")
    .apply([&cc])
    .concat(Query::select(&vars, "$src/*.s").apply([&asm]));
  let library = objects.fold().apply([&ar]).collect().unwrap();
  ninja.add_default(library.clone()).unwrap();
  ninja.finish().unwrap();

  let text = read(&ninja_path);
  assert_eq!(library.len(), 1);
  assert!(library[0].ends_with("libcore.a"));
  assert_eq!(build_lines(&text).len(), 4);
  assert_eq!(text.matches("\nrule ").count(), 3);
  assert!(text.contains("    command = cc -c $in -o $out\n"));
  assert!(text.contains("    description = CC $out\n"));
  assert!(text.contains(" || "));
  assert!(text.ends_with(&format!("default {}\n", library[0])));
  assert!(!text.contains("README"));
}

#[test]
fn rules_precede_builds_and_footer_counts_them() {
  let (temp, vars) = project(&["src/a.c", "src/b.c", "src/c.c"]);
  let ninja_path = temp.path().join("build.ninja");

  let ninja = NinjaGenerator::create(&ninja_path).unwrap();
  let cc = ninja.bind(compile(&vars, "cc", "c"));
  let objects = Query::select(&vars, "$src/*.c").apply([&cc]).collect().unwrap();
  assert_eq!(objects.len(), 3);
  ninja.finish().unwrap();

  let text = read(&ninja_path);
  assert!(text.find("\nrule cc").unwrap() < text.find("\nbuild ").unwrap());
  assert!(text.contains("# 3 build statements were generated\n"));
  assert!(text.ends_with("# default target:\n# (none)\n"));
}

#[test]
fn unit_stage_forwards_files_next_to_compiled_ones() {
  let (temp, vars) = project(&["src/main.c", "src/extra.o"]);
  let ninja = NinjaGenerator::create(temp.path().join("build.ninja")).unwrap();
  let cc = ninja.bind(compile(&vars, "cc", "c"));
  let unit = ninja.bind(UnitStage::new("prebuilt"));

  let objects = Query::select(&vars, "$src/*.c")
    .apply([&cc])
    .concat(Query::select(&vars, "$src/*.o").apply([&unit]))
    .fold()
    .elements()
    .unwrap();

  assert_eq!(objects.len(), 1);
  assert_eq!(objects[0].tag, TypeTag::ext("o"));
  assert_eq!(objects[0].paths.len(), 2);
  assert!(!unit.rule_emitted());
}

#[test]
fn error_type_mismatch_stops_the_pipeline() {
  let (temp, vars) = project(&["src/main.c"]);
  let ninja_path = temp.path().join("build.ninja");

  {
    let ninja = NinjaGenerator::create(&ninja_path).unwrap();
    let ar = ninja.bind(archive(&vars));
    let result = Query::select(&vars, "$src/*.c").apply([&ar]).collect();
    assert!(matches!(result, Err(QueryError::TypeMismatch { ref stage, .. }) if stage == "ar"));
    assert!(!ar.rule_emitted());
  }

  // dropping the generator still closes the file
  let text = read(&ninja_path);
  assert!(text.contains("# 0 build statements were generated\n"));
}

#[test]
fn flat_splits_a_folded_group_back_into_files() {
  let (temp, vars) = project(&["src/a.c", "src/b.c"]);
  let ninja = NinjaGenerator::create(temp.path().join("build.ninja")).unwrap();
  let cc = ninja.bind(compile(&vars, "cc", "c"));

  let elements = Query::select(&vars, "$src/*.c").fold().flat().apply([&cc]).elements().unwrap();

  assert_eq!(elements.len(), 2);
  assert!(elements.iter().all(|e| e.tag == TypeTag::ext("o") && e.paths.len() == 1));
}
