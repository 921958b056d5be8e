//! Spreadsheet exports: tab-separated text for the clipboard and xlsx files.

use crate::aggregate::{group_by_person, group_by_play, Overlap, PlayComparison};
use crate::parser::{default_headers, Record};
use anyhow::{Context, Result};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::path::Path;

fn tsv_writer() -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_writer(Vec::new())
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush TSV: {}", e.error()))?;
    let text = String::from_utf8(bytes).context("TSV is not UTF-8")?;
    Ok(text.trim_end_matches('\n').to_string())
}

/// Records as TSV with the default header row.
///
/// `categories` keeps only records whose trimmed category is listed; an
/// empty list keeps everything.
pub fn records_to_tsv(records: &[Record], categories: &[String]) -> Result<String> {
    let mut writer = tsv_writer();
    writer.write_record(default_headers())?;
    for record in records {
        if !categories.is_empty() && !categories.iter().any(|c| c == record.category.trim()) {
            continue;
        }
        writer.write_record(record.to_row())?;
    }
    finish(writer)
}

/// Person comparison of two plays as TSV.
pub fn comparison_to_tsv(comparison: &PlayComparison, play_a: &str, play_b: &str) -> Result<String> {
    let mut writer = tsv_writer();
    writer.write_record(["Kişi", "Durum", play_a, play_b])?;
    for entry in &comparison.common {
        let (roles_a, roles_b) = (entry.roles_a.join(", "), entry.roles_b.join(", "));
        writer.write_record([entry.name.as_str(), "Ortak", roles_a.as_str(), roles_b.as_str()])?;
    }
    let only_a = format!("Yalnız {}", play_a);
    for entry in &comparison.only_a {
        let roles = entry.roles.join(", ");
        writer.write_record([entry.name.as_str(), only_a.as_str(), roles.as_str(), ""])?;
    }
    let only_b = format!("Yalnız {}", play_b);
    for entry in &comparison.only_b {
        let roles = entry.roles.join(", ");
        writer.write_record([entry.name.as_str(), only_b.as_str(), "", roles.as_str()])?;
    }
    finish(writer)
}

/// Play overlap of two people as TSV.
pub fn overlap_to_tsv(overlap: &Overlap, person_a: &str, person_b: &str) -> Result<String> {
    let mut writer = tsv_writer();
    writer.write_record(["Oyun", "Durum"])?;
    let only_a = format!("Yalnız {}", person_a);
    let only_b = format!("Yalnız {}", person_b);
    let groups = [
        (&overlap.common, "Ortak"),
        (&overlap.only_a, only_a.as_str()),
        (&overlap.only_b, only_b.as_str()),
    ];
    for (plays, status) in groups {
        for play in plays {
            writer.write_record([play.as_str(), status])?;
        }
    }
    finish(writer)
}

fn write_header(sheet: &mut Worksheet, headers: &[&str], widths: &[f64]) -> Result<()> {
    let bold = Format::new().set_bold();
    for (col, (header, width)) in headers.iter().zip(widths).enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, &bold)?;
        sheet.set_column_width(col as u16, *width)?;
    }
    sheet.set_freeze_panes(1, 0)?;
    Ok(())
}

/// Write play, person and record sheets to an xlsx file.
pub fn export_workbook(path: &Path, records: &[Record]) -> Result<()> {
    let mut workbook = Workbook::new();

    // -- Plays --
    {
        let plays = group_by_play(records);
        let sheet = workbook.add_worksheet();
        sheet.set_name("Oyunlar")?;
        write_header(
            sheet,
            &["Oyun", "Kişi Sayısı", "Kayıt Sayısı", "Kategoriler"],
            &[32.0, 12.0, 12.0, 48.0],
        )?;
        for (i, play) in plays.iter().enumerate() {
            let row = (i + 1) as u32;
            sheet.write_string(row, 0, &play.name)?;
            sheet.write_number(row, 1, play.person_count as f64)?;
            sheet.write_number(row, 2, play.record_count as f64)?;
            sheet.write_string(row, 3, play.categories.join(", "))?;
        }
        sheet.autofilter(0, 0, plays.len() as u32, 3)?;
    }

    // -- People --
    {
        let people = group_by_person(records);
        let sheet = workbook.add_worksheet();
        sheet.set_name("Kişiler")?;
        write_header(
            sheet,
            &["Kişi", "Oyun Sayısı", "Oyunlar", "Görevler"],
            &[28.0, 12.0, 60.0, 40.0],
        )?;
        for (i, person) in people.iter().enumerate() {
            let row = (i + 1) as u32;
            sheet.write_string(row, 0, &person.name)?;
            sheet.write_number(row, 1, person.plays.len() as f64)?;
            sheet.write_string(row, 2, person.plays.join(", "))?;
            sheet.write_string(row, 3, person.roles.join(", "))?;
        }
        sheet.autofilter(0, 0, people.len() as u32, 3)?;
    }

    // -- Records --
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Kayıtlar")?;
        let headers = default_headers();
        let labels: Vec<&str> = headers.iter().map(String::as_str).collect();
        write_header(sheet, &labels, &[32.0, 20.0, 24.0, 32.0])?;
        for (i, record) in records.iter().enumerate() {
            let row = (i + 1) as u32;
            for (col, value) in record.to_row().iter().enumerate() {
                sheet.write_string(row, col as u16, value)?;
            }
        }
        sheet.autofilter(0, 0, records.len() as u32, 3)?;
    }

    workbook
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    log::info!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{compare_people, compare_plays};

    fn records() -> Vec<Record> {
        vec![
            Record::new("Hamlet", "Oyuncu", "Kral", "Ahmet"),
            Record::new("Hamlet", "Figüran", "-", "Mehmet, Ayşe"),
            Record::new("Lear", "Oyuncu", "Lear", "Ahmet"),
        ]
    }

    #[test]
    fn test_records_to_tsv() {
        let tsv = records_to_tsv(&records(), &[]).unwrap();
        let lines: Vec<&str> = tsv.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "Oyun\tKategori\tGörev\tKişi");
        assert_eq!(lines[2], "Hamlet\tFigüran\t-\tMehmet, Ayşe");
    }

    #[test]
    fn test_records_to_tsv_category_filter() {
        let tsv = records_to_tsv(&records(), &["Figüran".to_string()]).unwrap();
        assert_eq!(tsv.lines().count(), 2);
    }

    #[test]
    fn test_comparison_to_tsv() {
        let cmp = compare_plays(&records(), "Hamlet", "Lear");
        let tsv = comparison_to_tsv(&cmp, "Hamlet", "Lear").unwrap();
        let lines: Vec<&str> = tsv.lines().collect();
        assert_eq!(lines[0], "Kişi\tDurum\tHamlet\tLear");
        assert_eq!(lines[1], "Ahmet\tOrtak\tKral\tLear");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_overlap_to_tsv() {
        let ov = compare_people(&records(), "Ahmet", "Mehmet");
        let tsv = overlap_to_tsv(&ov, "Ahmet", "Mehmet").unwrap();
        assert_eq!(tsv, "Oyun\tDurum\nHamlet\tOrtak\nLear\tYalnız Ahmet");
    }

    #[test]
    fn test_export_workbook_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.xlsx");
        export_workbook(&path, &records()).unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }
}
