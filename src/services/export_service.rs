use rust_xlsxwriter::*;

use crate::dto::analytics_dto::TestAnalytics;
use crate::error::Result;

pub struct ExportService;

struct Palette {
    title: Format,
    header: Format,
    text: Format,
    number: Format,
    percent: Format,
}

impl Palette {
    fn new() -> Self {
        let border = Color::RGB(0xE2E8F0);
        let base = Format::new()
            .set_font_size(10)
            .set_align(FormatAlign::VerticalCenter)
            .set_border(FormatBorder::Thin)
            .set_border_color(border);
        Self {
            title: Format::new()
                .set_font_size(14)
                .set_bold()
                .set_font_color(Color::White)
                .set_background_color(Color::RGB(0x1E293B))
                .set_align(FormatAlign::VerticalCenter),
            header: base
                .clone()
                .set_bold()
                .set_font_color(Color::White)
                .set_background_color(Color::RGB(0x0F172A))
                .set_align(FormatAlign::Center),
            text: base.clone().set_text_wrap(),
            number: base.clone().set_align(FormatAlign::Center),
            percent: base.set_align(FormatAlign::Center).set_num_format("0.0\"%\""),
        }
    }
}

fn header_row(sheet: &mut Worksheet, row: u32, columns: &[(&str, f64)], palette: &Palette) -> Result<()> {
    for (i, (name, width)) in columns.iter().enumerate() {
        sheet.set_column_width(i as u16, *width)?;
        sheet.write_string_with_format(row, i as u16, *name, &palette.header)?;
    }
    Ok(())
}

impl ExportService {
    /// Workbook with a summary sheet, per-question answer distribution and
    /// result distribution.
    pub fn analytics_xlsx(test_title: &str, analytics: &TestAnalytics) -> Result<Vec<u8>> {
        let palette = Palette::new();
        let mut workbook = Workbook::new();

        {
            let sheet = workbook.add_worksheet();
            sheet.set_name("Summary")?;
            sheet.set_row_height(0, 28)?;
            sheet.merge_range(0, 0, 0, 1, test_title, &palette.title)?;
            header_row(sheet, 1, &[("Metric", 28.0), ("Value", 18.0)], &palette)?;

            let generated = chrono::Utc::now().format("%Y-%m-%d %H:%M UTC").to_string();
            sheet.write_string_with_format(2, 0, "Type", &palette.text)?;
            sheet.write_string_with_format(2, 1, analytics.test_type.as_str(), &palette.number)?;
            sheet.write_string_with_format(3, 0, "Total sessions", &palette.text)?;
            sheet.write_number_with_format(3, 1, analytics.total_sessions as f64, &palette.number)?;
            sheet.write_string_with_format(4, 0, "Completed sessions", &palette.text)?;
            sheet.write_number_with_format(4, 1, analytics.completed_sessions as f64, &palette.number)?;
            sheet.write_string_with_format(5, 0, "Completion rate", &palette.text)?;
            sheet.write_number_with_format(5, 1, analytics.completion_rate, &palette.percent)?;
            sheet.write_string_with_format(6, 0, "Average score", &palette.text)?;
            match analytics.average_score {
                Some(avg) => sheet.write_number_with_format(6, 1, avg, &palette.number)?,
                None => sheet.write_string_with_format(6, 1, "-", &palette.number)?,
            };
            sheet.write_string_with_format(7, 0, "Generated", &palette.text)?;
            sheet.write_string_with_format(7, 1, &generated, &palette.number)?;
        }

        {
            let sheet = workbook.add_worksheet();
            sheet.set_name("Questions")?;
            header_row(
                sheet,
                0,
                &[
                    ("#", 6.0),
                    ("Question", 45.0),
                    ("Answer", 40.0),
                    ("Count", 10.0),
                    ("Share", 10.0),
                ],
                &palette,
            )?;
            let mut row = 1u32;
            for q in &analytics.questions {
                for a in &q.answers {
                    sheet.write_number_with_format(row, 0, (q.order + 1) as f64, &palette.number)?;
                    sheet.write_string_with_format(row, 1, &q.text, &palette.text)?;
                    sheet.write_string_with_format(row, 2, &a.text, &palette.text)?;
                    sheet.write_number_with_format(row, 3, a.count as f64, &palette.number)?;
                    sheet.write_number_with_format(row, 4, a.percentage, &palette.percent)?;
                    row += 1;
                }
            }
            sheet.set_freeze_panes(1, 0)?;
        }

        {
            let sheet = workbook.add_worksheet();
            sheet.set_name("Results")?;
            header_row(
                sheet,
                0,
                &[("Result", 40.0), ("Count", 10.0), ("Share", 10.0)],
                &palette,
            )?;
            for (idx, r) in analytics.results.iter().enumerate() {
                let row = 1 + idx as u32;
                sheet.write_string_with_format(row, 0, &r.title, &palette.text)?;
                sheet.write_number_with_format(row, 1, r.count as f64, &palette.number)?;
                sheet.write_number_with_format(row, 2, r.percentage, &palette.percent)?;
            }
        }

        Ok(workbook.save_to_buffer()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::analytics_dto::{AnswerStats, QuestionStats, ResultStats};
    use crate::models::test::TestType;
    use uuid::Uuid;

    #[test]
    fn produces_a_zip_container() {
        let analytics = TestAnalytics {
            test_id: Uuid::new_v4(),
            test_type: TestType::Personality,
            total_sessions: 2,
            completed_sessions: 1,
            completion_rate: 50.0,
            average_score: None,
            questions: vec![QuestionStats {
                question_id: Uuid::new_v4(),
                order: 0,
                text: "Morning or night?".into(),
                total_answers: 1,
                answers: vec![AnswerStats {
                    answer_id: Uuid::new_v4(),
                    text: "Night".into(),
                    count: 1,
                    percentage: 100.0,
                }],
            }],
            results: vec![ResultStats {
                result_id: Uuid::new_v4(),
                title: "Owl".into(),
                count: 1,
                percentage: 100.0,
            }],
        };

        let bytes = ExportService::analytics_xlsx("Owls", &analytics).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }
}
