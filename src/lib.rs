/*!
# cp-tracker

Backend for a personal dashboard of competitive-programming solutions.

## Overview

Solutions live in a separate GitHub repository, one folder per problem under
a directory per platform:

```text
usaco/855/main.cpp
cses/1068-weird-algorithm/main.cpp
cf/1234-b-long-name/main.cpp
cf/tle-1500-c-slow-solution/main.cpp
```

The scanner walks those directories every few minutes, turns each folder
name into a problem id, title and verdict, downloads `main.cpp`, and merges
the result into a JSON file. An HTTP API serves that file to the dashboard
and accepts tags and notes for each problem.

## Architecture

### Scanner
- **Folder-name parser** - platform conventions, `tle-` marker detection
- **Source retrieval** - GitHub contents API listings and raw file fetches
- **Reconciliation** - merges a scan into the stored records without
  touching user annotations
- **Scheduling** - periodic passes, never more than one at a time

### Record store
- Single JSON document `{ "problems": [...], "lastModified": ... }`
- Whole-file reads and atomic whole-file writes
- Invalid entries are hidden from readers but kept on disk

### HTTP layer (feature `web`)
- `GET /api/problems` - list, with `platform`, `result` and `q` filters
- `PUT /api/problems/{problemId}` - update `tags` and/or `notes`
- `POST /api/scan` - start a scan pass now

## Modules

- **problem**: record type, platform and verdict enums
- **parser**: folder name to problem id, title and verdict
- **source**: repository coordinates, URLs and the `SourceTree` trait
- **reconcile**: pure merge of scanned problems into stored records
- **scanner**: scan passes and the periodic scheduler
- **store**: the JSON record store
- **config**: environment configuration
- **app**: routes and server startup
*/

pub mod config;
pub mod parser;
pub mod problem;
pub mod reconcile;
pub mod scanner;
pub mod source;
pub mod store;

#[cfg(feature = "web")]
pub mod app;

pub use problem::*;
