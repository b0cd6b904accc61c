use crate::job::Overdue;
use crate::store::{DueJob, View};

fn layout(title: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title} - Overdue</title>
    <style>
        * {{ box-sizing: border-box; margin: 0; padding: 0; }}
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; background: #f5f5f5; color: #333; line-height: 1.6; }}
        .container {{ max-width: 800px; margin: 0 auto; padding: 20px; }}
        header {{ background: #2563eb; color: white; padding: 20px; margin-bottom: 20px; }}
        header h1 {{ font-size: 1.5rem; }}
        .card {{ background: white; border-radius: 8px; box-shadow: 0 1px 3px rgba(0,0,0,0.1); overflow: hidden; margin-bottom: 20px; }}
        .card-header {{ background: #f8fafc; padding: 15px 20px; border-bottom: 1px solid #e5e7eb; font-weight: 600; }}
        .card-body {{ padding: 15px 20px; }}
        table {{ width: 100%; border-collapse: collapse; }}
        th, td {{ padding: 12px 20px; text-align: left; border-bottom: 1px solid #e5e7eb; }}
        th {{ background: #f8fafc; font-weight: 600; color: #666; font-size: 0.85rem; text-transform: uppercase; }}
        tr:hover {{ background: #f8fafc; }}
        .badge {{ display: inline-block; padding: 4px 12px; border-radius: 20px; font-size: 0.75rem; font-weight: 600; }}
        .badge-never {{ background: #fee2e2; color: #dc2626; }}
        .badge-done {{ background: #dbeafe; color: #1d4ed8; }}
        .btn {{ display: inline-block; padding: 6px 12px; border: none; border-radius: 4px; font-size: 0.85rem; cursor: pointer; }}
        .btn:disabled {{ opacity: 0.5; cursor: not-allowed; }}
        .btn-primary {{ background: #2563eb; color: white; }}
        .btn-success {{ background: #059669; color: white; }}
        .btn-danger {{ background: #dc2626; color: white; }}
        .btn-sm {{ padding: 4px 8px; font-size: 0.75rem; }}
        input {{ padding: 6px 10px; border: 1px solid #d1d5db; border-radius: 4px; margin-right: 10px; }}
        .hint {{ color: #666; font-size: 0.85rem; margin-top: 8px; }}
        .empty-state {{ text-align: center; padding: 40px; color: #666; }}
    </style>
</head>
<body>
    <header><div class="container"><h1>Overdue</h1></div></header>
    <div class="container">
        {content}
    </div>
</body>
</html>"#
    )
}

pub(crate) fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", n, unit)
    }
}

fn last_done_cell(due: &DueJob, now: i64) -> String {
    match (due.overdue, due.job.days_since_done(now)) {
        (Overdue::Never, _) | (_, None) => {
            r#"<span class="badge badge-never">never done</span>"#.to_string()
        }
        (_, Some(days)) => format!(
            r#"<span class="badge badge-done">{} ago</span>"#,
            plural(days, "day")
        ),
    }
}

fn render_due(view: &View) -> String {
    let rows = if view.due.is_empty() {
        let message = if view.total_jobs == 0 {
            "No jobs yet"
        } else {
            "Nothing is due"
        };
        format!(r#"<tr><td colspan="4" class="empty-state">{}</td></tr>"#, message)
    } else {
        view.due
            .iter()
            .map(|due| {
                format!(
                    r#"<tr><td>{}</td><td>every {}</td><td>{}</td><td>
                    <form style="display:inline" method="post" action="/jobs/{}/done"><button class="btn btn-success btn-sm">Done</button></form>
                    <form style="display:inline" method="post" action="/jobs/{}/delete"><button class="btn btn-danger btn-sm">Delete</button></form></td></tr>"#,
                    html_escape(due.job.title()),
                    plural(due.job.period_days() as i64, "day"),
                    last_done_cell(due, view.now),
                    due.id,
                    due.id
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"<div class="card"><div class="card-header">Due</div>
        <table><thead><tr><th>Job</th><th>Period</th><th>Last done</th><th>Actions</th></tr></thead>
        <tbody>{}</tbody></table></div>"#,
        rows
    )
}

fn render_form(view: &View) -> String {
    let (disabled, hint) = match &view.draft_status {
        Ok(()) => ("", String::new()),
        Err(e) => (
            " disabled",
            format!(r#"<p class="hint" id="draft-hint">{}</p>"#, html_escape(&e.to_string())),
        ),
    };

    // Mirrors the server-side draft rules so the button tracks the inputs.
    format!(
        r#"<div class="card"><div class="card-header">New job</div><div class="card-body">
        <form id="new-job" method="post" action="/jobs">
            <input name="title" placeholder="Title" value="{}">
            <input name="period" placeholder="Every N days" value="{}">
            <button id="create" class="btn btn-primary"{}>Create</button>
        </form>
        {}
        <script>
            (function () {{
                var form = document.getElementById('new-job');
                var button = document.getElementById('create');
                form.addEventListener('input', function () {{
                    var period = form.period.value;
                    var ok = form.title.value.length > 0 && /^[+-]?[0-9]+$/.test(period) && parseInt(period, 10) >= 1;
                    button.disabled = !ok;
                }});
            }})();
        </script>
        </div></div>"#,
        html_escape(&view.draft.title),
        html_escape(&view.draft.period),
        disabled,
        hint
    )
}

pub fn render_page(view: &View) -> String {
    let content = format!("{}\n{}", render_due(view), render_form(view));
    layout("Due", &content)
}
