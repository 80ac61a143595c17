//! UI route handler for the axum channel — the chat-style course form.
//!
//! A single static page: topic + audience + details in, the generated
//! objective/knowledge/lesson/summary fields rendered out.  No build step,
//! no framework; the page talks to `/api/course` with fetch.

use axum::response::Html;

const ROOT_INDEX_HTML: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>Coursesmith</title>
  <style>
    *, *::before, *::after { box-sizing: border-box; margin: 0; padding: 0; }
    body {
      font-family: system-ui, -apple-system, sans-serif;
      background: #0f0f0f; color: #e0e0e0;
      max-width: 860px; margin: 0 auto; padding: 2rem 1rem;
    }
    h1 { font-size: 1.4rem; margin-bottom: 0.25rem; }
    .sub { color: #888; font-size: 0.85rem; margin-bottom: 1.5rem; }
    form {
      display: grid; gap: 0.75rem;
      padding: 1.25rem; border: 1px solid #333; border-radius: 12px;
      background: #1a1a1a; margin-bottom: 1.5rem;
    }
    label { font-size: 0.8rem; color: #aaa; }
    input, textarea {
      width: 100%; padding: 0.5rem 0.75rem;
      border: 1px solid #333; border-radius: 8px;
      background: #111; color: #e0e0e0; font: inherit;
    }
    button {
      justify-self: start; padding: 0.5rem 1.5rem;
      border: 0; border-radius: 8px; background: #2a2a3a; color: #c0c0e0;
      font: inherit; cursor: pointer;
    }
    button:hover { background: #3a3a5a; }
    button:disabled { opacity: 0.5; cursor: wait; }
    .section {
      padding: 1rem 1.25rem; border: 1px solid #333; border-radius: 12px;
      background: #161616; margin-bottom: 1rem; display: none;
    }
    .section h2 { font-size: 1rem; margin-bottom: 0.5rem; color: #c0c0e0; }
    .section pre {
      white-space: pre-wrap; font: inherit; color: #d0d0d0; font-size: 0.9rem;
    }
    #status { color: #888; font-size: 0.85rem; margin-bottom: 1rem; }
    #error { color: #e08080; }
  </style>
</head>
<body>
  <h1>Coursesmith</h1>
  <p class="sub">Describe a course — objectives, grounding material, a lesson
  and a summary are generated for you.</p>

  <form id="course-form">
    <div>
      <label for="topic">Topic</label>
      <input id="topic" required placeholder="e.g. Rust ownership and borrowing" />
    </div>
    <div>
      <label for="audience">Audience</label>
      <input id="audience" required placeholder="e.g. developers coming from Python" />
    </div>
    <div>
      <label for="details">Details (optional)</label>
      <textarea id="details" rows="2" placeholder="special requests, focus areas…"></textarea>
    </div>
    <button id="go" type="submit">Generate course</button>
  </form>

  <p id="status"></p>

  <div class="section" id="objectives-card"><h2>Objectives</h2><pre id="objectives"></pre></div>
  <div class="section" id="knowledge-card"><h2>Knowledge</h2><pre id="knowledge"></pre></div>
  <div class="section" id="lesson-card"><h2>Lesson</h2><pre id="lesson"></pre></div>
  <div class="section" id="summary-card"><h2>Summary</h2><pre id="summary"></pre></div>
  <div class="section" id="export-card"><h2>Export</h2>
    <button id="download" type="button">Download Markdown</button>
  </div>

  <script>
    const form = document.getElementById('course-form');
    const status = document.getElementById('status');
    const go = document.getElementById('go');
    let lastCourse = null;

    function show(id, text) {
      document.getElementById(id + '-card').style.display = 'block';
      document.getElementById(id).textContent = text;
    }

    form.addEventListener('submit', async (ev) => {
      ev.preventDefault();
      go.disabled = true;
      status.textContent = 'Generating — this runs several model calls and can take a minute…';
      try {
        const resp = await fetch('/api/course', {
          method: 'POST',
          headers: { 'Content-Type': 'application/json' },
          body: JSON.stringify({
            topic: document.getElementById('topic').value,
            audience: document.getElementById('audience').value,
            details: document.getElementById('details').value || null,
          }),
        });
        const body = await resp.json();
        if (!resp.ok) throw new Error(body.message || resp.statusText);
        lastCourse = body;
        status.textContent = 'Done: ' + body.brief.title;
        show('objectives', body.objectives.map(
          (o, i) => (i + 1) + '. ' + o.goal + '\n   ' + o.description + '\n   Scope: ' + o.scope
        ).join('\n'));
        show('knowledge', body.knowledge.map(
          (k) => k.title + ' (' + k.source + ')'
        ).join('\n'));
        const l = body.lesson;
        show('lesson', l.title + '\n\n' + l.introduction + '\n\n' + l.core_content
          + '\n\n' + l.conclusion + (l.tips ? '\n\nTips: ' + l.tips : ''));
        show('summary', body.summary);
        document.getElementById('export-card').style.display = 'block';
      } catch (e) {
        status.innerHTML = '<span id="error">Generation failed: ' + e.message + '</span>';
      } finally {
        go.disabled = false;
      }
    });

    document.getElementById('download').addEventListener('click', () => {
      if (!lastCourse) return;
      const blob = new Blob([lastCourse.markdown], { type: 'text/markdown' });
      const a = document.createElement('a');
      a.href = URL.createObjectURL(blob);
      a.download = 'course.md';
      a.click();
      URL.revokeObjectURL(a.href);
    });
  </script>
</body>
</html>
"#;

/// GET / — the course form page.
pub(super) async fn root() -> Html<&'static str> {
    Html(ROOT_INDEX_HTML)
}
