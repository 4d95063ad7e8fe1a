#![allow(dead_code)]

use mutant_batch::ToolConfig;
use std::path::Path;
use tempfile::TempDir;

/// 模擬 I-Mutant 2.0 的 sh 腳本
///
/// 依模式輸出固定欄位報表；新殘基為 `X` 時只寫 stderr 並以 3 結束，
/// 找不到輸入檔則以 4 結束。
/// 每次啟動時會在 `counts` 記下當下存活的腳本數量；背景的 sleep 睡完後
/// 會留下 `slept.<pid>`。
const FAKE_IMUTANT: &str = r#"#!/bin/sh
dir="__DIR__"
mode="$1"
case "$mode" in
  -seq|-seqv) pos="$3"; res="$4"; ph="${5:-7.0}"; temp="${6:-25}" ;;
  -pdb|-pdbv) pos="$5"; res="$6"; ph="${7:-7.0}"; temp="${8:-25}" ;;
  *) echo "unknown mode $mode" >&2; exit 2 ;;
esac
[ -e "$2" ] || { echo "missing input $2" >&2; exit 4; }

touch "$dir/running.$$"
ls "$dir" | grep -c '^running\.' >> "$dir/counts"
( sleep __SLEEP__; touch "$dir/slept.$$" ) &
wait $!

if [ "$res" = "X" ]; then
  rm -f "$dir/running.$$"
  echo "Traceback: residue X is not supported" >&2
  exit 3
fi

echo " I-Mutant v2.0 : Predictor of Protein Stability Changes upon Mutations"
echo ""
echo "      Position   WT  NEW   Stability  RI  pH    T"
case "$mode" in
  -seq|-pdb)
    printf '       %-7s    %s   %-2s    %-8s   %s   %-3s   %-2s\n' "$pos" A "$res" Decrease 7 "$ph" "$temp" ;;
  -seqv|-pdbv)
    printf '       %-7s    %s   %-2s   %-5s  %-4s  %-3s\n' "$pos" A "$res" -0.85 "$ph" "$temp" ;;
esac
echo ""
echo " WT: Wild Type Residue"
rm -f "$dir/running.$$"
"#;

pub fn fake_tool(dir: &TempDir, sleep_secs: &str) -> ToolConfig {
    let state_dir = dir.path().join("state");
    std::fs::create_dir_all(&state_dir).unwrap();

    let script = FAKE_IMUTANT
        .replace("__DIR__", state_dir.to_str().unwrap())
        .replace("__SLEEP__", sleep_secs);
    let script_path = dir.path().join("fake-imutant.sh");
    std::fs::write(&script_path, script).unwrap();

    ToolConfig {
        program: "sh".to_string(),
        program_args: vec![script_path.to_str().unwrap().to_string()],
        script: None,
        working_dir: None,
    }
}

/// 每個子程序啟動時看到的存活數量
pub fn observed_counts(dir: &TempDir) -> Vec<usize> {
    let path = dir.path().join("state").join("counts");
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .filter_map(|l| l.trim().parse().ok())
        .collect()
}

/// 背景 sleep 睡完的次數
pub fn slept_markers(dir: &TempDir) -> usize {
    std::fs::read_dir(dir.path().join("state"))
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| e.file_name().to_string_lossy().starts_with("slept."))
                .count()
        })
        .unwrap_or(0)
}

pub fn fixture(dir: &Path, name: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, "fixture").unwrap();
    path.to_str().unwrap().to_string()
}
