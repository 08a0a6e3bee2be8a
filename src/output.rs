/*!
 * Tables and the HTML report produced by an analysis run.
 */
use crate::{
    population::Correlation,
    stats::Stats,
    trend::{Metric, Region, RegionSummary, YearOverYear},
    NightLightResult,
};
use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use serde::Serialize;
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

/**
 * One row of the yearly summary table, statistics with and without outliers side by side.
 */
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SummaryRow {
    pub year: i32,
    pub total_points: usize,
    pub outliers: usize,
    pub mean_with_outliers: f64,
    pub mean: f64,
    pub median_with_outliers: f64,
    pub median: f64,
    pub std_with_outliers: f64,
    pub std: f64,
    pub trimmed_mean_5pct: f64,
    pub trimmed_mean_10pct: f64,
    pub mad: f64,
    pub q1: f64,
    pub q3: f64,
    pub min: f64,
    pub max: f64,
    pub total_radiance: f64,
}

impl SummaryRow {
    /// `raw` is computed over every point in the boundary, `robust` over the clean points.
    pub fn new(year: i32, raw: &Stats, robust: &Stats) -> Self {
        SummaryRow {
            year,
            total_points: raw.count,
            outliers: raw.count - robust.count,
            mean_with_outliers: raw.mean,
            mean: robust.mean,
            median_with_outliers: raw.median,
            median: robust.median,
            std_with_outliers: raw.std,
            std: robust.std,
            trimmed_mean_5pct: robust.trimmed_mean_5pct,
            trimmed_mean_10pct: robust.trimmed_mean_10pct,
            mad: robust.mad,
            q1: robust.q1,
            q3: robust.q3,
            min: robust.min,
            max: robust.max,
            total_radiance: robust.sum,
        }
    }
}

#[derive(Debug, Serialize)]
struct TrendRow {
    metric: &'static str,
    from_year: i32,
    to_year: i32,
    pct_change: f64,
}

#[derive(Debug, Serialize)]
struct RegionalChangeRow {
    region: Region,
    from_year: i32,
    to_year: i32,
    pct_change: f64,
}

fn write_rows<P, T, I>(path: P, rows: I) -> NightLightResult<()>
where
    P: AsRef<Path>,
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut writer = WriterBuilder::new().from_writer(file);

    let mut count = 0;
    for row in rows {
        writer.serialize(row)?;
        count += 1;
    }
    writer.flush()?;

    log::debug!("wrote {} rows to {}", count, path.display());
    Ok(())
}

/// Write the yearly summary table.
pub fn write_summary_csv<P: AsRef<Path>>(path: P, rows: &[SummaryRow]) -> NightLightResult<()> {
    write_rows(path, rows)
}

/// Write year over year changes, one row per metric per pair of years.
pub fn write_trends_csv<P: AsRef<Path>>(
    path: P,
    trends: &[(Metric, Vec<YearOverYear>)],
) -> NightLightResult<()> {
    let rows = trends.iter().flat_map(|(metric, changes)| {
        changes.iter().map(move |yoy| TrendRow {
            metric: metric.into(),
            from_year: yoy.from_year,
            to_year: yoy.to_year,
            pct_change: yoy.pct_change,
        })
    });

    write_rows(path, rows)
}

/// Write the per year regional summaries.
pub fn write_regional_csv<P: AsRef<Path>>(path: P, rows: &[RegionSummary]) -> NightLightResult<()> {
    write_rows(path, rows)
}

/// Write the change in each region's mean between two years.
pub fn write_regional_changes_csv<P: AsRef<Path>>(
    path: P,
    changes: &[(Region, YearOverYear)],
) -> NightLightResult<()> {
    let rows = changes.iter().map(|(region, yoy)| RegionalChangeRow {
        region: *region,
        from_year: yoy.from_year,
        to_year: yoy.to_year,
        pct_change: yoy.pct_change,
    });

    write_rows(path, rows)
}

/// Write the joined population and radiance series.
pub fn write_correlation_csv<P: AsRef<Path>>(path: P, corr: &Correlation) -> NightLightResult<()> {
    write_rows(path, &corr.rows)
}

/**
 * Everything that goes into the HTML report.
 */
#[derive(Debug)]
pub struct Report<'a> {
    pub title: &'a str,
    pub generated: DateTime<Utc>,
    pub summary: &'a [SummaryRow],
    pub failed_years: &'a [(i32, String)],
    /// First year to last year change of each metric.
    pub overall: &'a [(Metric, YearOverYear)],
    pub regional: &'a [(Region, YearOverYear)],
    pub correlation: Option<&'a Correlation>,
    /// File names of the other outputs, linked from the report.
    pub artifacts: &'a [String],
}

/// Write a static HTML page summarizing a run.
pub fn write_html_report<P: AsRef<Path>>(path: P, report: &Report) -> NightLightResult<()> {
    let path = path.as_ref();
    let mut out = BufWriter::new(File::create(path)?);

    write_report(&mut out, report)?;
    out.flush()?;

    log::debug!("wrote report to {}", path.display());
    Ok(())
}

fn write_report<W: Write>(out: &mut W, report: &Report) -> NightLightResult<()> {
    const STYLE: &str = concat!(
        "body { font-family: sans-serif; margin: 2em; }\n",
        "table { border-collapse: collapse; margin-bottom: 2em; }\n",
        "th, td { border: 1px solid #ccc; padding: 4px 8px; text-align: right; }\n",
        "th { background: #eee; }\n",
    );

    writeln!(out, "<!DOCTYPE html>")?;
    writeln!(out, "<html>\n<head>\n<meta charset=\"utf-8\">")?;
    writeln!(out, "<title>{}</title>", escape(report.title))?;
    writeln!(out, "<style>\n{}</style>\n</head>\n<body>", STYLE)?;
    writeln!(out, "<h1>{}</h1>", escape(report.title))?;
    writeln!(
        out,
        "<p>Generated {}</p>",
        report.generated.format("%Y-%m-%d %H:%M:%S UTC")
    )?;

    writeln!(out, "<h2>Yearly statistics</h2>")?;
    writeln!(out, "<table>")?;
    writeln!(
        out,
        concat!(
            "<tr><th>Year</th><th>Points</th><th>Outliers</th>",
            "<th>Mean (with outliers)</th><th>Mean</th>",
            "<th>Median (with outliers)</th><th>Median</th>",
            "<th>Std Dev</th><th>5% Trimmed Mean</th><th>10% Trimmed Mean</th>",
            "<th>MAD</th><th>Max</th><th>Total Radiance</th></tr>"
        )
    )?;
    for row in report.summary {
        writeln!(
            out,
            concat!(
                "<tr><td>{}</td><td>{}</td><td>{}</td>",
                "<td>{:.4}</td><td>{:.4}</td><td>{:.4}</td><td>{:.4}</td>",
                "<td>{:.4}</td><td>{:.4}</td><td>{:.4}</td>",
                "<td>{:.4}</td><td>{:.4}</td><td>{:.2}</td></tr>"
            ),
            row.year,
            row.total_points,
            row.outliers,
            row.mean_with_outliers,
            row.mean,
            row.median_with_outliers,
            row.median,
            row.std,
            row.trimmed_mean_5pct,
            row.trimmed_mean_10pct,
            row.mad,
            row.max,
            row.total_radiance
        )?;
    }
    writeln!(out, "</table>")?;

    if !report.failed_years.is_empty() {
        writeln!(out, "<h2>Years not analyzed</h2>\n<ul>")?;
        for (year, reason) in report.failed_years {
            writeln!(out, "<li>{}: {}</li>", year, escape(reason))?;
        }
        writeln!(out, "</ul>")?;
    }

    if !report.overall.is_empty() {
        writeln!(out, "<h2>Overall change</h2>\n<table>")?;
        writeln!(out, "<tr><th>Metric</th><th>Years</th><th>Change</th></tr>")?;
        for (metric, yoy) in report.overall {
            writeln!(
                out,
                "<tr><td>{}</td><td>{} - {}</td><td>{:+.2}%</td></tr>",
                metric, yoy.from_year, yoy.to_year, yoy.pct_change
            )?;
        }
        writeln!(out, "</table>")?;
    }

    if !report.regional.is_empty() {
        writeln!(out, "<h2>Regional change</h2>\n<table>")?;
        writeln!(out, "<tr><th>Region</th><th>Years</th><th>Change</th></tr>")?;
        for (region, yoy) in report.regional {
            writeln!(
                out,
                "<tr><td>{}</td><td>{} - {}</td><td>{:+.2}%</td></tr>",
                region, yoy.from_year, yoy.to_year, yoy.pct_change
            )?;
        }
        writeln!(out, "</table>")?;
    }

    if let Some(corr) = report.correlation {
        writeln!(out, "<h2>Population growth and radiance</h2>")?;
        match corr.coefficient {
            Some(r) => writeln!(out, "<p>Correlation coefficient: {:.3}</p>", r)?,
            None => writeln!(out, "<p>Not enough data for a correlation.</p>")?,
        }
    }

    if !report.artifacts.is_empty() {
        writeln!(out, "<h2>Files</h2>\n<ul>")?;
        for name in report.artifacts {
            writeln!(out, "<li><a href=\"{0}\">{0}</a></li>", escape(name))?;
        }
        writeln!(out, "</ul>")?;
    }

    writeln!(out, "</body>\n</html>")?;
    Ok(())
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::population::CorrelationRow;
    use std::fs;
    use tempfile::TempDir;

    fn summary() -> SummaryRow {
        let raw = Stats::from_values([1.0, 2.0, 3.0, 100.0]).unwrap();
        let robust = Stats::from_values([1.0, 2.0, 3.0]).unwrap();
        SummaryRow::new(2014, &raw, &robust)
    }

    #[test]
    fn test_summary_row() {
        let row = summary();
        assert_eq!(row.total_points, 4);
        assert_eq!(row.outliers, 1);
        assert_eq!(row.mean, 2.0);
        assert_eq!(row.mean_with_outliers, 26.5);
        assert_eq!(row.total_radiance, 6.0);
    }

    #[test]
    fn test_write_summary_csv() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("summary.csv");

        write_summary_csv(&path, &[summary()]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert!(lines
            .next()
            .unwrap()
            .starts_with("year,total_points,outliers,mean_with_outliers,mean,"));
        assert!(lines.next().unwrap().starts_with("2014,4,1,26.5,2.0,"));
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_write_trends_csv() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trends.csv");

        let yoy = |from_year, to_year, pct_change| YearOverYear {
            from_year,
            to_year,
            pct_change,
        };
        let trends = [
            (Metric::Mean, vec![yoy(2014, 2015, 20.0), yoy(2015, 2016, -25.0)]),
            (Metric::TrimmedMean5, vec![yoy(2014, 2015, 1.5)]),
        ];
        write_trends_csv(&path, &trends).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "metric,from_year,to_year,pct_change");
        assert_eq!(lines[1], "Mean,2014,2015,20.0");
        assert_eq!(lines[2], "Mean,2015,2016,-25.0");
        assert_eq!(lines[3], "5% Trimmed Mean,2014,2015,1.5");
    }

    #[test]
    fn test_write_regional_csv() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("regional.csv");

        let rows = [RegionSummary {
            year: 2020,
            region: Region::Central,
            mean: 1.5,
            median: 1.0,
            count: 12,
        }];
        write_regional_csv(&path, &rows).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "year,region,mean,median,count\n2020,Central,1.5,1.0,12\n"
        );
    }

    #[test]
    fn test_html_report() {
        let corr = Correlation {
            rows: vec![CorrelationRow {
                year: 2014,
                growth_rate: 1.2,
                mean_radiance: 0.8,
            }],
            coefficient: None,
        };
        let overall = [(
            Metric::Mean,
            YearOverYear {
                from_year: 2014,
                to_year: 2023,
                pct_change: 12.5,
            },
        )];
        let failed = [(2016, "missing file: <dir>/VIIRS_India_2016.csv".to_owned())];
        let artifacts = ["summary.csv".to_owned()];

        let report = Report {
            title: "Night Lights: India",
            generated: Utc::now(),
            summary: &[summary()],
            failed_years: &failed,
            overall: &overall,
            regional: &[],
            correlation: Some(&corr),
            artifacts: &artifacts,
        };

        let mut buf: Vec<u8> = vec![];
        write_report(&mut buf, &report).unwrap();
        let html = String::from_utf8(buf).unwrap();

        assert!(html.contains("<title>Night Lights: India</title>"));
        assert!(html.contains("<td>2014</td><td>4</td><td>1</td>"));
        assert!(html.contains("<td>+12.50%</td>"));
        assert!(html.contains("&lt;dir&gt;"));
        assert!(html.contains("Not enough data"));
        assert!(html.contains("<a href=\"summary.csv\">summary.csv</a>"));
        assert!(!html.contains("Regional change"));
        assert!(html.trim_end().ends_with("</html>"));
    }

    #[test]
    fn test_html_report_escapes_title() {
        let report = Report {
            title: "Night Lights: Trinidad & <Tobago>",
            generated: Utc::now(),
            summary: &[],
            failed_years: &[],
            overall: &[],
            regional: &[],
            correlation: None,
            artifacts: &[],
        };

        let mut buf: Vec<u8> = vec![];
        write_report(&mut buf, &report).unwrap();
        let html = String::from_utf8(buf).unwrap();

        assert!(html.contains("<title>Night Lights: Trinidad &amp; &lt;Tobago&gt;</title>"));
        assert!(html.contains("<h1>Night Lights: Trinidad &amp; &lt;Tobago&gt;</h1>"));
        assert!(!html.contains("<Tobago>"));
    }
}
